use std::process::ExitCode;

fn main() -> ExitCode {
    azimuth_cli::run()
}
