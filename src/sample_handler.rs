//! サンプルルートの実装
//!
//! CGI・CLI両方のエントリポイントから使う簡単なルートテーブル。

use log::info;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use reqwrap::error::Error;
use reqwrap::handler::{self, RouteTable};
use reqwrap::validation::{CustomValidation, ValidationFailure, Violation};
use reqwrap::{CliRequest, Request, RequestValidationMapper, Response, SuccessResponse};

/// 登録フォーム
#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(required, length(min = 3, max = 32))]
    pub name: Option<String>,
    #[validate(required, email)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

impl CustomValidation for SignupForm {
    fn validate_custom(&self) -> Result<(), ValidationFailure> {
        if self.password.len() < 8 {
            return Err(ValidationFailure::single(Violation::new(
                "password",
                "length",
                "password must be at least 8 characters long",
            )));
        }
        if self.password != self.password_confirmation {
            return Err(ValidationFailure::single(Violation::new(
                "password_confirmation",
                "confirmed",
                "password confirmation does not match",
            )));
        }
        Ok(())
    }
}

fn hello(req: &mut Request) -> Result<Response, Error> {
    info!("Handling Hello request");
    Response::ok().with_json_body(&json!({
        "message": "Hello from reqwrap",
        "version": env!("CARGO_PKG_VERSION"),
        "ip": req.ip(),
        "ajax": req.is_ajax(),
    }))
}

fn echo(req: &mut Request) -> Result<Response, Error> {
    let accept_xml = req.header_line("accept").contains("xml");
    let data = json!({
        "method": req.method(),
        "path": req.path(),
        "query": req.query_params(),
        "body": req.parsed_body(),
    });
    if accept_xml {
        Response::ok().with_xml_body(&data)
    } else {
        Response::ok().with_json_body(&data)
    }
}

fn signup(req: &mut Request) -> Result<Response, Error> {
    let mut mapper = RequestValidationMapper::default();
    mapper.set_request(req);
    let form: SignupForm = mapper.map_body_to_object()?;
    let body = SuccessResponse::new()
        .with_detail("account created")
        .with_value("name", form.name.unwrap_or_default());
    Response::new(http::StatusCode::CREATED).with_json_body(&body)
}

fn greet(req: &mut CliRequest) -> Result<(), Error> {
    let name = req
        .param("name")
        .and_then(|v| v.as_str())
        .unwrap_or("world")
        .to_string();
    println!("Hello, {}!", name);
    for arg in req.args() {
        println!("  arg: {}", arg);
    }
    Ok(())
}

fn show_request(req: &mut CliRequest) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(&*req)
        .map_err(|e| Error::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// サンプルのルートテーブルを構築する
pub fn sample_routes() -> Result<RouteTable, Error> {
    Ok(RouteTable::new()
        .route(handler::get("/", hello)?.with_name("home"))
        .route(handler::get("/echo(/.*)?", echo)?.with_name("echo"))
        .route(handler::post("/echo(/.*)?", echo)?.with_name("echo.post"))
        .route(handler::post("/signup", signup)?.with_name("signup"))
        .route(
            handler::get("/panic", |_req: &mut Request| -> Result<Response, Error> {
                panic!("intentional panic for testing")
            })?
            .with_name("panic"),
        )
        .command(handler::cli(r"/hello(/(?P<name>[^/]+))?", greet)?.with_name("hello"))
        .command(handler::cli("/request", show_request)?.with_name("request")))
}
