mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use controller_core::config::{LoopConfig, parse_config};
use controller_core::status::LoopObserver;

use session::Session;

const USAGE: &str = "Usage: controller-emulator [--config \"key=value ...\"] [--transcript <path>]";

struct Options {
    config: LoopConfig,
    transcript: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    if !options.config.conversion_fits() {
        eprintln!(
            "warning: conversion latency {} exceeds trigger spacing {}, the loop will overrun",
            options.config.conversion_latency(),
            options.config.trigger_spacing()
        );
    }

    let observer = LoopObserver::new();
    let mut session = Session::new(&options.config, &observer, options.transcript.as_deref())
        .unwrap_or_else(|err| {
            eprintln!("{err}");
            process::exit(1);
        });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(writer, "ADC-PWM loop emulator ready ({}).", options.config)?;
    writeln!(writer, "Enter samples, `help` for commands or `exit` to quit.")?;

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if should_terminate(trimmed) {
            break;
        }

        match session.handle_line(trimmed) {
            Ok(responses) => {
                for response in responses {
                    writeln!(writer, "{response}")?;
                }
            }
            Err(err) => {
                writeln!(writer, "{err}")?;
                break;
            }
        }
    }

    match session.finish() {
        Ok(summary) => writeln!(writer, "{summary}"),
        Err(err) => writeln!(writer, "{err}"),
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        config: LoopConfig::default(),
        transcript: None,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--config" => {
                let line = value()?;
                options.config = parse_config(&line).map_err(|err| format!("--config: {err}"))?;
            }
            "--transcript" => options.transcript = Some(PathBuf::from(value()?)),
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(options)
}
