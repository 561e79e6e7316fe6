//! CLIでのエントリポイント
//!
//! `reqwrap <path> [args...]` の形式でサンプルのCLIルートを実行する。

use env_logger::Env;
use log::{debug, error};

use reqwrap::CliRequest;

mod sample_handler;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let routes = match sample_handler::sample_routes() {
        Ok(routes) => routes,
        Err(e) => {
            error!("Failed to build routes: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = CliRequest::from_args(std::env::args(), &routes).and_then(|mut req| {
        debug!("Running CLI request {:?}", req);
        req.handle()
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
