use std::process::ExitCode;

use clap::Parser;

use umbctl::{Args, ExitStatus, fake_device_client, real_device_client, run_with_log_level};

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let status = if error.use_stderr() {
                ExitStatus::Usage
            } else {
                ExitStatus::Success
            };
            // Nothing useful remains to report if the terminal is gone.
            let _ = error.print();
            return status.into();
        }
    };
    let mut stdout = std::io::stdout();

    let log_level = args.log_level();
    let output_format = args.output_format();
    let (command, maybe_fake_args) = args.into_command_and_fake_args();
    let device_client = match maybe_fake_args {
        Some(fake_args) => fake_device_client(fake_args),
        None => real_device_client(),
    };

    match run_with_log_level(command, &mut stdout, device_client, log_level, output_format) {
        Ok(()) => ExitStatus::Success.into(),
        Err(error) => {
            eprintln!("umbctl: {error:#}");
            ExitStatus::for_error(&error).into()
        }
    }
}
