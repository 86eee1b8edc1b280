//! coolmaster CLI Client
//!
//! Command-line interface for reading and driving AC units through a
//! controller.

use clap::{Parser, Subcommand, ValueEnum};
use coolmaster::config::DEFAULT_PORT;
use coolmaster::{Config, Controller, Device, TargetMode};
use tracing_subscriber::{fmt, EnvFilter};

/// coolmaster CLI
#[derive(Parser, Debug)]
#[command(name = "coolmaster-cli")]
#[command(about = "Query and control AC units behind a CoolMaster controller")]
#[command(version)]
struct Args {
    /// Controller host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Controller port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Per-command timeout in milliseconds
    #[arg(short, long, default_value = "1500")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the full state of a unit
    Status {
        /// Unit id, e.g. L1.100
        unit: String,
    },

    /// Switch a unit on or off
    Power {
        unit: String,

        #[arg(value_enum)]
        state: PowerArg,
    },

    /// Select cool or heat mode and print the setpoint now in effect
    Mode {
        unit: String,

        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Read the setpoint, or set it when a value is given
    Temp {
        unit: String,

        value: Option<f64>,
    },

    /// Read the fan speed percentage, or set it when a value is given
    Fan {
        unit: String,

        percent: Option<f64>,
    },

    /// Send a raw command line and print the response
    Raw {
        /// Command words, e.g. `query L1.100 o`
        #[arg(required = true, num_args = 1..)]
        line: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PowerArg {
    On,
    Off,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Cool,
    Heat,
}

impl From<ModeArg> for TargetMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Cool => TargetMode::Cool,
            ModeArg::Heat => TargetMode::Heat,
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,coolmaster=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .command_timeout_ms(args.timeout_ms)
        .build();

    tracing::debug!("coolmaster-cli v{} -> {}", coolmaster::VERSION, config.addr());

    let controller = match Controller::connect(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = run(&controller, args.command);
    controller.shutdown();

    if let Err(e) = outcome {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(controller: &Controller, command: Commands) -> coolmaster::Result<()> {
    match command {
        Commands::Status { unit } => {
            let device = controller.unit(&unit);
            let state = device.device_state()?;
            let scale = state
                .temperature_unit
                .unwrap_or(controller.config().default_temperature_unit);

            println!("unit:     {}", state.unit_id);
            println!("power:    {}", state.on_off);
            println!("mode:     {}", state.operating_mode);
            println!("setpoint: {} ({})", state.setpoint_temperature, scale);
            println!("room:     {} ({})", state.room_temperature, scale);
            println!("fan:      {}", state.fan_mode);
            println!("running:  {:?}", coolmaster::translate::running_state(&state));
        }
        Commands::Power { unit, state } => {
            let device = controller.unit(&unit);
            device.set_power_state(matches!(state, PowerArg::On))?;
            print_power(&device)?;
        }
        Commands::Mode { unit, mode } => {
            let setpoint = controller.unit(&unit).set_mode(mode.into())?;
            println!("{:?}, setpoint {}", TargetMode::from(mode), setpoint);
        }
        Commands::Temp { unit, value } => {
            let device = controller.unit(&unit);
            if let Some(value) = value {
                device.set_target_temperature(value)?;
            }
            println!("{}", device.target_temperature()?);
        }
        Commands::Fan { unit, percent } => {
            let device = controller.unit(&unit);
            match percent {
                Some(percent) => println!("sent fspeed {}", device.set_fan_speed(percent)?),
                None => println!("{}%", device.fan_speed()?),
            }
        }
        Commands::Raw { line } => {
            let wire = format!("{}{}", line.join(" "), coolmaster::protocol::LINE_TERMINATOR);
            println!("{}", controller.dispatcher().execute(wire)?);
        }
    }

    Ok(())
}

fn print_power(device: &Device) -> coolmaster::Result<()> {
    let on = device.power_state()?;
    println!("{} is {}", device.display_name(), if on { "on" } else { "off" });
    Ok(())
}
