use std::process::ExitCode;

use rankprep::apps::run_build_training_set;

fn main() -> ExitCode {
    match run_build_training_set(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rankprep: {err}");
            ExitCode::FAILURE
        }
    }
}
