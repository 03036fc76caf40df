#![no_main]
#![no_std]

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use cortex_m::interrupt::Mutex;
use cortex_m_rt::{entry, exception, ExceptionFrame};
use log::{error, info, LevelFilter, Metadata, Record};
use panic_halt as _;
use rtt_target::{rprintln, rtt_init_print};
use stm32f4xx_hal::adc::{config::AdcConfig, Adc};
use stm32f4xx_hal::otg_fs::USB;
use stm32f4xx_hal::timer::CounterMs;
use stm32f4xx_hal::{
    gpio::{self, Analog, Edge, Input, Output, PushPull},
    pac::{self, interrupt, Interrupt},
    prelude::*,
};

use hotair_ctrl::commands::{extract_command, send_housekeeping};
use hotair_ctrl::devices::fan::FanPwm;
use hotair_ctrl::devices::sensor::AdcSensor;
use hotair_ctrl::{Calibration, GunConfig, HotGun, PhaseModulator, PowerMode, TickPath};

use crate::usb::{usb_init, usb_println, usb_read};

mod usb;

type Gate = gpio::PC6<Output<PushPull>>;
type TempSensor = AdcSensor<Adc<pac::ADC1>, pac::ADC1, gpio::PA0<Analog>>;

// heater gate, sensor and temperature history, driven by the zero-cross interrupt
static G_TICK: TickPath<Gate, TempSensor> = TickPath::empty();
static G_PERIOD_END: AtomicBool = AtomicBool::new(false);

static G_ZERO_CROSS: Mutex<RefCell<Option<gpio::PB0<Input>>>> = Mutex::new(RefCell::new(None));
static G_CLOCK: Mutex<RefCell<Option<CounterMs<pac::TIM5>>>> = Mutex::new(RefCell::new(None));

const HK_INTERVAL_MS: u32 = 500;

struct RttLogger;

impl log::Log for RttLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            rprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: RttLogger = RttLogger;

fn now_ms() -> u32 {
    cortex_m::interrupt::free(|cs| {
        G_CLOCK
            .borrow(cs)
            .borrow()
            .as_ref()
            .map_or(0, |clock| clock.now().ticks())
    })
}

#[entry]
fn main() -> ! {
    rtt_init_print!();
    let _ = log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Info));

    let mut dp = pac::Peripherals::take().unwrap();

    let rcc = dp.RCC.constrain();

    let clocks = rcc
        .cfgr
        .use_hse(8.MHz())
        .sysclk(48.MHz())
        .hclk(48.MHz())
        .require_pll48clk()
        .pclk1(24.MHz())
        .pclk2(24.MHz())
        .freeze();

    let mut clock = dp.TIM5.counter_ms(&clocks);
    clock.start(2_678_400_000.millis()).unwrap(); // set the timeout to 31 days
    cortex_m::interrupt::free(|cs| {
        G_CLOCK.borrow(cs).replace(Some(clock));
    });

    let mut delay = dp.TIM1.delay_us(&clocks);
    delay.delay(100.millis()); // apparently required for USB to set up properly...

    // initialize ports
    let gpioa = dp.GPIOA.split();
    let gpiob = dp.GPIOB.split();
    let gpioc = dp.GPIOC.split();

    // heater triac gate and mains relay
    let gate = gpioc.pc6.into_push_pull_output();
    let relay = gpioc.pc7.into_push_pull_output();

    // thermocouple amplifier
    let adc = Adc::adc1(dp.ADC1, true, AdcConfig::default());
    let sensor = AdcSensor::new(adc, gpioa.pa0.into_analog());

    // fan pwm on timer 3
    let config = GunConfig::default();
    let fan_pin = gpioc.pc8.into_alternate();
    let fan_pwm = dp.TIM3.pwm_hz(fan_pin, 20.kHz(), &clocks).split();
    let fan = FanPwm::new(fan_pwm, config.max_fan_speed);

    G_TICK.install(PhaseModulator::new(gate, config.period), sensor);

    // AC zero-cross detector
    let mut zero_cross = gpiob.pb0.into_floating_input();
    let mut syscfg = dp.SYSCFG.constrain();
    zero_cross.make_interrupt_source(&mut syscfg);
    zero_cross.trigger_on_edge(&mut dp.EXTI, Edge::Rising);
    zero_cross.enable_interrupt(&mut dp.EXTI);
    let zero_cross_irq = zero_cross.interrupt();
    cortex_m::interrupt::free(|cs| {
        G_ZERO_CROSS.borrow(cs).replace(Some(zero_cross));
    });

    let mut gun = HotGun::new(&G_TICK, relay, fan, config).unwrap();
    let units = Calibration::default();

    // initialize usb
    let usb = USB {
        usb_global: dp.OTG_FS_GLOBAL,
        usb_device: dp.OTG_FS_DEVICE,
        usb_pwrclk: dp.OTG_FS_PWRCLK,
        pin_dm: gpioa.pa11.into_alternate(),
        pin_dp: gpioa.pa12.into_alternate(),
        hclk: clocks.hclk(),
    };

    delay.delay(100.millis());
    unsafe {
        usb_init(usb);
        cortex_m::peripheral::NVIC::unmask(Interrupt::OTG_FS);
        cortex_m::peripheral::NVIC::unmask(zero_cross_irq);
    }

    info!("boot up ok");

    let mut hk = true;
    let mut last_hk = now_ms();
    let mut message_bytes = [0u8; 64];

    loop {
        let now = now_ms();

        if G_PERIOD_END.swap(false, Ordering::AcqRel) {
            gun.advance(now);
        } else if gun.mode() != PowerMode::Off && !gun.is_synchronized(now) {
            error!("mains synchronization lost, shutting down");
            gun.shutdown();
        }

        let n = usb_read(&mut message_bytes);
        if n > 0 {
            if let Ok(cmd) = core::str::from_utf8(&message_bytes[..n]) {
                let ack = extract_command(cmd, &mut gun, &units, &mut hk, now);
                usb_println(ack.as_str());
            }
        }

        if hk && now.wrapping_sub(last_hk) >= HK_INTERVAL_MS {
            last_hk = now;
            usb_println(send_housekeeping(&gun.telemetry(&units)).as_str());
        }

        cortex_m::asm::wfi();
    }
}

#[interrupt]
fn EXTI0() {
    cortex_m::interrupt::free(|cs| {
        if let Some(pin) = G_ZERO_CROSS.borrow(cs).borrow_mut().as_mut() {
            pin.clear_interrupt_pending_bit();
        }
    });
    if G_TICK.sync_cb(now_ms()) {
        G_PERIOD_END.store(true, Ordering::Release);
    }
}

#[exception]
#[allow(non_snake_case)]
unsafe fn HardFault(_ef: &ExceptionFrame) -> ! {
    loop {}
}
