#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod config;
mod device_id;
mod dht22;
mod eth;
mod network;
mod soil;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Pause between scheduler ticks
const LOOP_PERIOD_MS: u64 = 100;

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART1, USART2, USART3])]
mod app {
    use super::*;
    use defmt::{info, warn, Debug2Format};
    use embassy_futures::join::join3;
    use embassy_stm32::adc::{Adc, AdcChannel};
    use embassy_stm32::exti::ExtiInput;
    use embassy_stm32::gpio::{Flex, Level, Output, Pull, Speed};
    use embassy_stm32::peripherals;
    use embassy_stm32::rcc::{Hse, HseMode};
    use embassy_stm32::spi::{self, Spi};
    use embassy_stm32::time::Hertz;
    use embassy_time::Delay;
    use greenhouse_core::{wait_for_link, ClockAdjuster, MqttPublisher, Scheduler, SensorReader};

    use crate::config::BoardConfig;
    use crate::dht22::Dht22;
    use crate::network::{manager, MqttLink, SntpClient, StackLink};
    use crate::soil::SoilAdc;

    type Peri<T> = embassy_stm32::Peri<'static, T>;

    struct NetworkPeripherals {
        spi: Peri<peripherals::SPI2>,
        sck: Peri<peripherals::PB13>,
        mosi: Peri<peripherals::PB15>,
        miso: Peri<peripherals::PB14>,
        cs: Peri<peripherals::PC6>,
        reset: Peri<peripherals::PC3>,
        int: Peri<peripherals::PC2>,
        exti: Peri<peripherals::EXTI2>,
        dma_tx: Peri<peripherals::DMA1_CH4>,
        dma_rx: Peri<peripherals::DMA1_CH3>,
    }

    /// DHT22 on D5 and the six analog inputs A0..A5
    struct SensorPeripherals {
        dht: Peri<peripherals::PC7>,
        adc: Peri<peripherals::ADC1>,
        a0: Peri<peripherals::PA4>,
        a1: Peri<peripherals::PA5>,
        a2: Peri<peripherals::PA6>,
        a3: Peri<peripherals::PA7>,
        a4: Peri<peripherals::PC4>,
        a5: Peri<peripherals::PC5>,
    }

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        led: Output<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("Greenhouse node starting...");

        // Adafruit Feather STM32F405: 12 MHz HSE
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(12_000_000),
            mode: HseMode::Oscillator,
        });

        // HSE (12 MHz) / PREDIV(6) = 2 MHz (PLL input)
        // 2 MHz * MUL(168) = 336 MHz (VCO)
        // VCO / DIVP(4) = 84 MHz (SYSCLK)
        // VCO / DIVQ(7) = 48 MHz
        config.rcc.pll_src = embassy_stm32::rcc::PllSource::HSE;
        config.rcc.pll = Some(embassy_stm32::rcc::Pll {
            prediv: embassy_stm32::rcc::PllPreDiv::DIV6,
            mul: embassy_stm32::rcc::PllMul::MUL168,
            divp: Some(embassy_stm32::rcc::PllPDiv::DIV4),
            divq: Some(embassy_stm32::rcc::PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.sys = embassy_stm32::rcc::Sysclk::PLL1_P;
        config.rcc.ahb_pre = embassy_stm32::rcc::AHBPrescaler::DIV1; // 84 MHz
        config.rcc.apb1_pre = embassy_stm32::rcc::APBPrescaler::DIV2; // 42 MHz
        config.rcc.apb2_pre = embassy_stm32::rcc::APBPrescaler::DIV1; // 84 MHz

        let p = embassy_stm32::init(config);
        info!("System initialized: SYSCLK=84MHz from 12MHz HSE");

        // TIM2 on APB1: timer clock = 2*APB1 when prescaler != 1
        let timer_clock_hz = 84_000_000;
        Mono::start(timer_clock_hz);
        info!("TIM2 monotonic timer initialized at 1 MHz");

        let led = Output::new(p.PC1, Level::High, Speed::Low);

        let net_periph = NetworkPeripherals {
            spi: p.SPI2,
            sck: p.PB13,
            mosi: p.PB15,
            miso: p.PB14,
            cs: p.PC6,
            reset: p.PC3,
            int: p.PC2,
            exti: p.EXTI2,
            dma_tx: p.DMA1_CH4,
            dma_rx: p.DMA1_CH3,
        };

        let sensor_periph = SensorPeripherals {
            dht: p.PC7,
            adc: p.ADC1,
            a0: p.PA4,
            a1: p.PA5,
            a2: p.PA6,
            a3: p.PA7,
            a4: p.PC4,
            a5: p.PC5,
        };

        heartbeat::spawn().ok();
        node_task::spawn(net_periph, sensor_periph).ok();

        (Shared {}, Local { led })
    }

    /// Heartbeat task
    #[task(priority = 1, local = [led])]
    async fn heartbeat(cx: heartbeat::Context) {
        info!("Heartbeat task started");
        loop {
            cx.local.led.set_high();
            Mono::delay(100.millis()).await;
            cx.local.led.set_low();
            Mono::delay(4900.millis()).await;
        }
    }

    /// Node task - owns the network stack, the sensors and the scheduler
    ///
    /// Stack and drivers are !Send, so they are built inside this task from
    /// the raw peripherals.
    #[task(priority = 1)]
    async fn node_task(
        _cx: node_task::Context,
        periph: NetworkPeripherals,
        sensors: SensorPeripherals,
    ) -> ! {
        use embassy_net::{Config, StackResources};
        use static_cell::StaticCell;

        info!("Node task started");
        let config = BoardConfig::default();

        let mut spi_config = spi::Config::default();
        spi_config.frequency = Hertz(10_000_000); // 10 MHz for W5500

        let spi = Spi::new(
            periph.spi,
            periph.sck,
            periph.mosi,
            periph.miso,
            periph.dma_tx,
            periph.dma_rx,
            spi_config,
        );

        let cs = Output::new(periph.cs, Level::High, Speed::VeryHigh);
        let reset = Output::new(periph.reset, Level::High, Speed::Low);
        let int = ExtiInput::new(periph.int, periph.exti, Pull::Up);

        let eth_periph = eth::EthPeripherals {
            spi,
            cs,
            reset,
            int,
        };

        let (device, w5500_runner) = match eth::init_w5500(eth_periph, config.network.mac_addr).await
        {
            Ok(parts) => parts,
            Err(e) => defmt::panic!("W5500 init failed: {:?}", Debug2Format(&e)),
        };

        static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
        let (stack, mut net_runner) = embassy_net::new(
            device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            config.network.seed,
        );
        info!("Network stack initialized with DHCP");

        let app_logic = run_node(stack, config, sensors);

        join3(w5500_runner.run(), net_runner.run(), app_logic).await;
    }

    async fn run_node(
        stack: embassy_net::Stack<'static>,
        config: BoardConfig,
        sensors: SensorPeripherals,
    ) -> ! {
        let node = config.node;
        info!(
            "Device {} at {}",
            node.device.id, node.device.location
        );

        info!("Waiting for network link...");
        match wait_for_link(&StackLink::new(stack), &mut Delay, node.link).await {
            Ok(polls) => info!("Network link up after {} polls", polls),
            Err(e) => warn!("{}", e),
        }
        manager::log_config(&stack);

        let air = Dht22::new(Flex::new(sensors.dht));
        let soil = SoilAdc::new(
            Adc::new(sensors.adc),
            [
                sensors.a0.degrade_adc(),
                sensors.a1.degrade_adc(),
                sensors.a2.degrade_adc(),
                sensors.a3.degrade_adc(),
                sensors.a4.degrade_adc(),
                sensors.a5.degrade_adc(),
            ],
        );
        let reader = SensorReader::new(node.sensors, air, soil, Delay);

        let clock = ClockAdjuster::new(node.clock, SntpClient::new(stack, config.sntp));

        let transport = MqttLink::new(stack, node.mqtt);
        let publisher = match MqttPublisher::new(&node.mqtt, node.device.id, transport) {
            Ok(publisher) => publisher,
            Err(e) => defmt::panic!("Cannot publish as {}: {}", node.device.id, e),
        };

        let mut scheduler = Scheduler::new(node.schedule, reader, clock, publisher);
        info!("Entering main loop");

        loop {
            let now_ms = Mono::now().duration_since_epoch().to_millis() as u32;
            scheduler.tick(now_ms).await;
            Mono::delay(LOOP_PERIOD_MS.millis()).await;
        }
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        info!("Idle task started - entering WFI loop");
        loop {
            cortex_m::asm::wfi();
        }
    }
}
