fn main() -> std::process::ExitCode {
    match caustics_cli::internal_main() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:?}", err);
            std::process::ExitCode::FAILURE
        }
    }
}
