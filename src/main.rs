use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match minelaunch_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("minelaunch: {}", e);
            ExitCode::FAILURE
        }
    }
}
