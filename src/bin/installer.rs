use std::process::ExitCode;

fn main() -> ExitCode {
    if !cfg!(target_os = "linux") {
        eprintln!("This installer is designed for Linux systems only.");
        return ExitCode::FAILURE;
    }
    arc_timers_lib::installer::run();
    ExitCode::SUCCESS
}
