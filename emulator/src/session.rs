use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant as HostInstant};

use controller_core::actuation::duty_basis_points;
use controller_core::config::{ConfigError, LoopConfig};
use controller_core::sample::SampleValue;
use controller_core::sim::{ClosedLoop, HeldSample, LoopFault, TickReport};
use controller_core::status::{LoopObserver, StatusFormatter};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "<samples>",
        "<s> [s ...]   - run one period per sample (0-4095, whitespace or comma separated)",
    ),
    ("status", "status        - print the observer snapshot"),
    ("config", "config        - print the active loop configuration"),
    ("help", "help          - show this list"),
];

/// Errors that end a session.
#[derive(Debug)]
pub enum SessionError {
    Config(ConfigError),
    Io(io::Error),
    Fault(LoopFault),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Config(error) => write!(f, "invalid configuration: {error}"),
            SessionError::Io(error) => write!(f, "transcript: {error}"),
            SessionError::Fault(fault) => write!(f, "loop halted: {fault}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ConfigError> for SessionError {
    fn from(error: ConfigError) -> Self {
        SessionError::Config(error)
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::Io(error)
    }
}

impl From<LoopFault> for SessionError {
    fn from(fault: LoopFault) -> Self {
        SessionError::Fault(fault)
    }
}

/// Result of running one period with a held input sample.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PeriodReport {
    pub sample: SampleValue,
    /// Ticks the output was high during the period that just ran.
    pub high_ticks: u16,
    pub period: u16,
    /// Compare value committed at the zero that closed the period.
    pub committed: u16,
}

impl fmt::Display for PeriodReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duty = duty_basis_points(self.high_ticks, self.period);
        write!(
            f,
            "sample={} committed={}/{} measured={}/{} ({}.{:02}%)",
            self.sample,
            self.committed,
            self.period,
            self.high_ticks,
            self.period,
            duty / 100,
            duty % 100
        )
    }
}

pub struct Session<'o> {
    config: LoopConfig,
    sim: ClosedLoop<'o, HeldSample>,
    observer: &'o LoopObserver,
    /// Report of the tick that opened the current period.
    period_start: TickReport,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

impl<'o> Session<'o> {
    /// Builds and starts the loop. The input holds zero until the first sample.
    pub fn new(
        config: &LoopConfig,
        observer: &'o LoopObserver,
        transcript: Option<&Path>,
    ) -> Result<Self, SessionError> {
        let mut sim = ClosedLoop::with_observer(config, HeldSample(SampleValue::ZERO), observer)?;
        let period_start = sim.start()?;

        let transcript = transcript
            .map(|path| TranscriptLogger::new(path, config))
            .transpose()?;

        Ok(Self {
            config: *config,
            sim,
            observer,
            period_start,
            transcript,
            started_at: HostInstant::now(),
        })
    }

    /// Handles one input line and returns the lines to print.
    pub fn handle_line(&mut self, line: &str) -> Result<Vec<String>, SessionError> {
        self.log(TranscriptRole::Host, line)?;

        let responses = match line.trim() {
            "help" => HELP_TOPICS
                .iter()
                .map(|(_, text)| (*text).to_string())
                .collect(),
            "status" => vec![self.status_line()],
            "config" => vec![self.config.to_string()],
            samples => self.run_samples(samples)?,
        };

        for response in &responses {
            self.log(TranscriptRole::Emulator, response)?;
        }
        Ok(responses)
    }

    /// Runs one period per sample token in `input`.
    fn run_samples(&mut self, input: &str) -> Result<Vec<String>, SessionError> {
        let mut responses = Vec::new();
        for token in input
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
        {
            match parse_sample(token) {
                Some(sample) => {
                    let report = self.run_period(sample)?;
                    responses.push(format!("{} {report}", self.sim.now()));
                }
                None => responses.push(format!("ignored `{token}`: expected 0..=4095")),
            }
        }
        Ok(responses)
    }

    /// Holds `sample` on the input for one full period, starting at the
    /// current zero, and stops on the next zero.
    pub fn run_period(&mut self, sample: SampleValue) -> Result<PeriodReport, SessionError> {
        self.sim.source_mut().0 = sample;
        let period = self.sim.hardware().pwm.committed().period();

        let mut high_ticks = u16::from(self.period_start.output.is_high());
        for _ in 1..period {
            if self.sim.tick()?.output.is_high() {
                high_ticks += 1;
            }
        }
        self.period_start = self.sim.tick()?;

        Ok(PeriodReport {
            sample,
            high_ticks,
            period,
            committed: self.sim.hardware().pwm.committed().compare(),
        })
    }

    pub fn status_line(&self) -> String {
        StatusFormatter::new(&self.observer.snapshot()).to_string()
    }

    /// Writes the closing summary to the transcript.
    pub fn finish(&mut self) -> Result<String, SessionError> {
        let summary = format!("{} {}", self.sim.now(), self.status_line());
        self.log(TranscriptRole::Emulator, &summary)?;
        Ok(summary)
    }

    fn log(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        let elapsed = self.started_at.elapsed();
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(elapsed, role, line),
            None => Ok(()),
        }
    }
}

fn parse_sample(token: &str) -> Option<SampleValue> {
    token.parse::<u16>().ok().and_then(SampleValue::new)
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "<",
            TranscriptRole::Emulator => ">",
        }
    }
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, config: &LoopConfig) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        writeln!(logger.writer, "# controller-emulator transcript")?;
        writeln!(logger.writer, "# {config}")?;
        writeln!(logger.writer, "# Timestamps are milliseconds since session start")?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, elapsed: Duration, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}
