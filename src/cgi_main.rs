//! CGI環境でのエントリポイント
//!
//! CGI環境で実行される際のメインプログラム

use std::sync::Arc;

use env_logger::Env;
use log::{error, info};
use reqwrap::{cgi, Config, RequestFactory, Router};

// サンプルハンドラの実装
mod sample_handler;

#[tokio::main]
async fn main() {
    // CGIでは標準出力がHTTPレスポンスとなるため、ログは標準エラー出力に出力する
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    info!("Starting reqwrap CGI application");

    let routes = match sample_handler::sample_routes() {
        Ok(routes) => routes,
        Err(err) => {
            error!("Failed to build routes: {}", err);
            std::process::exit(1);
        }
    };
    let router: Arc<dyn Router> = Arc::new(routes);
    let factory = RequestFactory::new(Config::from_env()).with_router(router);

    if let Err(err) = cgi::run_cgi(factory).await {
        error!("Error running CGI application: {:?}", err);
        std::process::exit(1);
    }
}
