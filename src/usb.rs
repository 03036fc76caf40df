use core::cell::RefCell;
use cortex_m::interrupt::Mutex;
use stm32f4xx_hal::otg_fs::{UsbBus, UsbBusType, USB};
use stm32f4xx_hal::pac::interrupt;
use usb_device::bus::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::SerialPort;

// Make USB serial device globally available
pub static G_USB_SERIAL: Mutex<RefCell<Option<SerialPort<UsbBus<USB>>>>> =
    Mutex::new(RefCell::new(None));

// Make USB device globally available
pub static G_USB_DEVICE: Mutex<RefCell<Option<UsbDevice<UsbBus<USB>>>>> =
    Mutex::new(RefCell::new(None));

/// # Safety
/// Call once, before the OTG_FS interrupt is unmasked.
pub unsafe fn usb_init(usb: USB) {
    static mut EP_MEMORY: [u32; 1024] = [0; 1024];
    static mut USB_BUS: Option<UsbBusAllocator<UsbBusType>> = None;
    USB_BUS = Some(UsbBusType::new(usb, &mut EP_MEMORY));
    let usb_bus = match USB_BUS.as_ref() {
        None => return,
        Some(bus) => bus,
    };
    let serial_port = SerialPort::new(usb_bus);
    let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x16c0, 0x27dd))
        .manufacturer("Hot Air Station")
        .product("Hot Air Gun Controller")
        .serial_number("HOTAIR")
        .device_class(usbd_serial::USB_CLASS_CDC)
        .build();
    cortex_m::interrupt::free(|cs| {
        *G_USB_SERIAL.borrow(cs).borrow_mut() = Some(serial_port);
        *G_USB_DEVICE.borrow(cs).borrow_mut() = Some(usb_dev);
    });
}

/// Read whatever the host has sent, returns the number of bytes.
pub fn usb_read(message: &mut [u8]) -> usize {
    cortex_m::interrupt::free(|cs| match G_USB_SERIAL.borrow(cs).borrow_mut().as_mut() {
        None => 0,
        Some(serial) => serial.read(message).unwrap_or(0),
    })
}

pub fn usb_println(string: &str) -> bool {
    cortex_m::interrupt::free(|cs| match G_USB_SERIAL.borrow(cs).borrow_mut().as_mut() {
        None => false,
        Some(serial) => serial.write(string.as_bytes()).is_ok() && serial.write(b"\r\n").is_ok(),
    })
}

#[interrupt]
fn OTG_FS() {
    cortex_m::interrupt::free(|cs| {
        if let Some(usb_dev) = G_USB_DEVICE.borrow(cs).borrow_mut().as_mut() {
            if let Some(serial) = G_USB_SERIAL.borrow(cs).borrow_mut().as_mut() {
                // do this regularly to keep connection to USB host
                usb_dev.poll(&mut [serial]);
            }
        }
    });
}
