//! Sample an MCP3208 wired to a Raspberry Pi and print the readings.

use clap::Parser;
use log::LevelFilter;
use mcp3208::{Channel, Mcp3208, StdClock};
use rppal::gpio::Gpio;
use rppal::hal::Delay;
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

#[derive(Parser, Debug)]
#[command(name = "pi")]
#[command(author, version, about = "Sample an MCP3208 ADC over SPI", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// SPI bus number
    #[arg(long, default_value_t = 0)]
    bus: u8,

    /// Hardware slave select line of the bus
    #[arg(long, default_value_t = 0)]
    slave_select: u8,

    /// BCM number of the GPIO driving the ADC's chip select
    #[arg(long, default_value_t = 24)]
    cs_pin: u8,

    /// SPI clock in Hz
    #[arg(long, default_value_t = 1_000_000)]
    clock_hz: u32,

    /// Reference voltage in millivolts
    #[arg(long, default_value_t = 3300)]
    vref_mv: u16,

    /// Input channel
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..8))]
    channel: u8,

    /// Treat --channel as a differential configuration (0 = CH0+/CH1-, 1 = CH0-/CH1+, ...)
    #[arg(long)]
    differential: bool,

    /// Read every single-ended input once and exit
    #[arg(long, conflicts_with_all = ["frequency", "trigger"])]
    all: bool,

    /// Number of samples to collect
    #[arg(short = 'n', long, default_value_t = 16)]
    count: usize,

    /// Target sampling frequency in Hz; unpaced when omitted
    #[arg(short, long)]
    frequency: Option<u32>,

    /// Discard samples until one reaches this raw code
    #[arg(short, long)]
    trigger: Option<u16>,

    /// Give up waiting for the trigger after this many samples
    #[arg(long, requires = "trigger")]
    max_attempts: Option<u32>,

    /// Calibrate and report the conversion time before sampling
    #[arg(long)]
    calibrate: bool,
}

fn spi_bus(bus: u8) -> anyhow::Result<Bus> {
    Ok(match bus {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        _ => anyhow::bail!("no SPI bus {bus}"),
    })
}

fn slave_select(ss: u8) -> anyhow::Result<SlaveSelect> {
    Ok(match ss {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        _ => anyhow::bail!("no slave select {ss}"),
    })
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .init();

    let gpio = Gpio::new()?;

    let spi = Spi::new(
        spi_bus(cli.bus)?,
        slave_select(cli.slave_select)?,
        cli.clock_hz,
        Mode::Mode0,
    )?;

    let cs = gpio.get(cli.cs_pin)?.into_output_high();

    let mut mcp = Mcp3208::new(spi, cs, StdClock::new(), Delay::new(), cli.vref_mv);

    if cli.all {
        for channel in Channel::all() {
            let data = mcp.read(channel)?;
            println!("{channel:?}: {data} ({} mV)", mcp.to_analog(data));
        }

        return Ok(());
    }

    let channel = if cli.differential {
        Channel::from_selector(cli.channel)
    } else {
        Channel::single(cli.channel)
    }
    .ok_or_else(|| anyhow::anyhow!("no channel {}", cli.channel))?;

    if cli.calibrate {
        let ns = mcp.calibrate(channel)?;
        log::info!("{ns} ns per conversion, at most {} samples/s", 1_000_000_000 / ns.max(1));
    }

    let mut samples = vec![0u16; cli.count];

    let trigger = cli.trigger.map(|threshold| move |data: u16| data >= threshold);

    match (cli.frequency, trigger, cli.max_attempts) {
        (None, None, _) => mcp.read_many(channel, &mut samples)?,
        (Some(hz), None, _) => mcp.read_many_at_rate(channel, &mut samples, hz)?,
        (None, Some(trigger), None) => mcp.read_until(channel, &mut samples, trigger)?,
        (None, Some(trigger), Some(max)) => {
            mcp.read_until_within(channel, &mut samples, max, trigger)?
        }
        (Some(hz), Some(trigger), None) => {
            mcp.read_until_at_rate(channel, &mut samples, hz, trigger)?
        }
        (Some(hz), Some(trigger), Some(max)) => {
            mcp.read_until_at_rate_within(channel, &mut samples, hz, max, trigger)?
        }
    }

    log::debug!("{} samples, {} uV per code", samples.len(), mcp.analog_resolution());

    for (index, data) in samples.iter().enumerate() {
        println!("{index:>5} {data:>4} {:>5} mV", mcp.to_analog(*data));
    }

    Ok(())
}
