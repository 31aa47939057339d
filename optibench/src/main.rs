use std::process::ExitCode;

fn main() -> ExitCode {
    match optibench::run() {
        Ok(status) => status.exit_code(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
