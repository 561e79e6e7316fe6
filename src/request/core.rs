//! リクエストデコレーター

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};

use http::header::{HeaderValue, HOST};
use http::{HeaderMap, Uri, Version};
use log::{debug, info};
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;
use serde_json::Value;

use crate::common::{
    parse_header, Attributes, BodyStream, Config, Method, ParamBuckets, ParameterBucket, Route, Router,
};
use crate::error::Error;
use crate::response::Response;
use super::context::{version_from_str, version_to_str};
use super::path::PathResolver;
use super::static_file::{static_file_mime, static_file_path};

/// 通知メッセージ（文字列、またはタイトル・種別付き）
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
#[serde(untagged)]
pub enum Notice {
    Text(String),
    Detailed {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        title: Option<String>,
        content: String,
        #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
        kind: Option<String>,
    },
}

impl From<&str> for Notice {
    fn from(value: &str) -> Self {
        Notice::Text(value.to_string())
    }
}

impl From<String> for Notice {
    fn from(value: String) -> Self {
        Notice::Text(value)
    }
}

/// リクエストの解決状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Uninitialized,
    PathResolved,
    RouteResolved,
}

#[derive(Clone)]
pub(super) enum RouteState {
    Unresolved,
    Resolved(Option<Arc<dyn Route>>),
}

/// HTTPリクエストのデコレーター
///
/// メッセージ本体（メソッド・URI・ヘッダー・ボディ）に、型付きメソッド、
/// パス・ルートの遅延解決、エラー・通知リストなどを付加する。
/// `with_*` 系は受け手を変更せず、新しいインスタンスを返す。
#[derive(Clone)]
pub struct Request {
    pub(super) method: http::Method,
    pub(super) uri: Uri,
    pub(super) version: Version,
    pub(super) headers: HeaderMap,
    pub(super) body: BodyStream,
    pub(super) request_target: Option<String>,
    pub(super) server: BTreeMap<String, String>,
    pub(super) cookies: ParameterBucket,
    pub(super) buckets: ParamBuckets,
    pub(super) parsed_body: Option<Value>,
    pub(super) attributes: Attributes,
    pub(super) config: Arc<Config>,
    pub(super) router: Option<Arc<dyn Router>>,
    pub(super) params: ParameterBucket,
    pub(super) errors: Vec<String>,
    pub(super) notices: Vec<Notice>,
    pub(super) pass_errors: Vec<String>,
    pub(super) pass_notices: Vec<Notice>,
    pub(super) previous: Option<Weak<Request>>,
    pub(super) path: OnceLock<Vec<String>>,
    pub(super) route: RouteState,
}

impl Request {
    /// 既定設定・ルーターなしでリクエストを作成する
    pub fn new(method: &str, uri: &str) -> Result<Self, Error> {
        super::factory::RequestFactory::new(Config::default())
            .create(super::context::ServerContext::new(method, uri))
    }

    /// ルーターを差し替えた新しいインスタンス（ルート解決はやり直し）
    pub fn with_router(&self, router: Arc<dyn Router>) -> Self {
        let mut next = self.fork();
        next.router = Some(router);
        next
    }

    // --- 解決状態 ----------------------------------------------------------

    /// 解決状態を取得
    pub fn state(&self) -> RequestState {
        match (&self.route, self.path.get()) {
            (RouteState::Resolved(_), _) => RequestState::RouteResolved,
            (RouteState::Unresolved, Some(_)) => RequestState::PathResolved,
            (RouteState::Unresolved, None) => RequestState::Uninitialized,
        }
    }

    /// 小文字化済みのパスセグメント（初回のみ解決し、以後はキャッシュ）
    pub fn path(&self) -> &[String] {
        self.path.get_or_init(|| {
            PathResolver::from_config(&self.config).resolve_request(self.uri.path(), &self.buckets.query)
        })
    }

    /// 型付きのリクエスト種別（未知のメソッドはGET）
    pub fn request_type(&self) -> Method {
        Method::parse_or_default(self.method.as_str())
    }

    /// 生のメソッド文字列
    pub fn method(&self) -> &str {
        self.method.as_str()
    }

    /// ルートを取得する
    ///
    /// 初回のみルーターへ問い合わせ、結果（見つからなかった場合も含む）をキャッシュする。
    pub fn route(&mut self) -> Option<Arc<dyn Route>> {
        if let RouteState::Resolved(route) = &self.route {
            return route.clone();
        }

        let method = self.request_type();
        let path = self.path().to_vec();
        let route = match &self.router {
            Some(router) => router.lookup(method, &path, &mut self.params),
            None => None,
        };
        debug!(
            "Route lookup for {} /{}: {}",
            method,
            path.join("/"),
            if route.is_some() { "found" } else { "not found" }
        );
        self.route = RouteState::Resolved(route.clone());
        route
    }

    /// 解決済みルートの名前
    pub fn route_name(&self) -> Option<&str> {
        match &self.route {
            RouteState::Resolved(Some(route)) => route.name(),
            _ => None,
        }
    }

    /// ルートへ処理を委譲する
    pub async fn handle(&mut self) -> Result<Response, Error> {
        let Some(route) = self.route() else {
            return Err(Error::RouteNotFound {
                method: self.method().to_string(),
                path: self.path().join("/"),
            });
        };
        info!("Dispatching {} /{}", self.method(), self.path().join("/"));
        route.handle(self).await
    }

    // --- 便利機能 ----------------------------------------------------------

    /// クライアントIP
    ///
    /// `HTTP_CLIENT_IP` → `HTTP_X_FORWARDED_FOR` → `REMOTE_ADDR` の順で最初に存在するもの。
    /// ヘッダーをそのまま信頼するため、信頼できないプロキシ環境では偽装されうる。
    pub fn ip(&self) -> String {
        ["HTTP_CLIENT_IP", "HTTP_X_FORWARDED_FOR", "REMOTE_ADDR"]
            .iter()
            .find_map(|key| self.server.get(*key))
            .cloned()
            .unwrap_or_default()
    }

    /// AJAXリクエストかどうか
    pub fn is_ajax(&self) -> bool {
        self.header("x-requested-with")
            .iter()
            .any(|v| v.trim().to_lowercase() == "xmlhttprequest")
    }

    /// 静的ファイルへのリクエストか
    pub fn is_static_file(&self) -> bool {
        self.static_file().is_some()
    }

    /// 静的ファイルのMIMEタイプ
    pub fn static_file_mime(&self) -> Option<String> {
        self.static_file().map(|p| static_file_mime(&p))
    }

    fn static_file(&self) -> Option<PathBuf> {
        static_file_path(self.uri.path(), &self.config)
    }

    // --- エラー・通知 ------------------------------------------------------

    pub fn add_error(&mut self, error: impl Into<String>) -> &mut Self {
        self.errors.push(error.into());
        self
    }

    pub fn add_pass_error(&mut self, error: impl Into<String>) -> &mut Self {
        self.pass_errors.push(error.into());
        self
    }

    pub fn add_notice(&mut self, notice: impl Into<Notice>) -> &mut Self {
        self.notices.push(notice.into());
        self
    }

    pub fn add_pass_notice(&mut self, notice: impl Into<Notice>) -> &mut Self {
        self.pass_notices.push(notice.into());
        self
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn pass_errors(&self) -> &[String] {
        &self.pass_errors
    }

    pub fn pass_notices(&self) -> &[Notice] {
        &self.pass_notices
    }

    /// 前のリクエストの引き継ぎリストを先頭に取り込み、参照を保持する
    pub fn set_previous_request(&mut self, previous: &Arc<Request>) -> &mut Self {
        let mut errors = previous.pass_errors.clone();
        errors.append(&mut self.errors);
        self.errors = errors;

        let mut notices = previous.pass_notices.clone();
        notices.append(&mut self.notices);
        self.notices = notices;

        self.previous = Some(Arc::downgrade(previous));
        self
    }

    /// 前のリクエスト（既に破棄されていればNone）
    pub fn previous_request(&self) -> Option<Arc<Request>> {
        self.previous.as_ref().and_then(Weak::upgrade)
    }

    // --- パラメータ --------------------------------------------------------

    /// ルートパラメータ → 統合ビュー（request）の順で検索
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name).or_else(|| self.buckets.request.get(name))
    }

    pub fn param_or(&self, name: &str, default: impl Into<Value>) -> Value {
        self.param(name).cloned().unwrap_or_else(|| default.into())
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(name, value);
        self
    }

    pub fn set_params(&mut self, params: ParameterBucket) -> &mut Self {
        self.params = params;
        self
    }

    /// ルートパラメータ
    pub fn params(&self) -> &ParameterBucket {
        &self.params
    }

    pub fn query_params(&self) -> &ParameterBucket {
        &self.buckets.query
    }

    pub fn get_get(&self, name: &str) -> Option<&Value> {
        self.buckets.query.get(name)
    }

    pub fn parsed_body(&self) -> Option<&Value> {
        self.parsed_body.as_ref()
    }

    /// パース済みボディの値
    pub fn get_post(&self, name: &str) -> Option<&Value> {
        self.parsed_body.as_ref().and_then(|body| body.get(name))
    }

    pub fn put_params(&self) -> &ParameterBucket {
        &self.buckets.put
    }

    pub fn request_params(&self) -> &ParameterBucket {
        &self.buckets.request
    }

    pub fn cookie_params(&self) -> &ParameterBucket {
        &self.cookies
    }

    pub fn server_params(&self) -> &BTreeMap<String, String> {
        &self.server
    }

    pub fn server_param(&self, name: &str) -> Option<&str> {
        self.server.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute<T: 'static>(&self, name: &str) -> Option<&T> {
        self.attributes.get::<T>(name)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // --- メッセージ --------------------------------------------------------

    pub fn protocol_version(&self) -> &'static str {
        version_to_str(self.version)
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// リクエストターゲット（未設定ならパス＋クエリ）
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.request_target {
            return target.clone();
        }
        let path = self.uri.path();
        let path = if path.is_empty() { "/" } else { path };
        match self.uri.query() {
            Some(q) if !q.is_empty() => format!("{}?{}", path, q),
            _ => path.to_string(),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// 指定ヘッダーの全値（大小無視、無ければ空）
    pub fn header(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// 指定ヘッダーの値をカンマ区切りで連結
    pub fn header_line(&self, name: &str) -> String {
        self.header(name).join(", ")
    }

    pub fn body(&self) -> &BodyStream {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut BodyStream {
        &mut self.body
    }

    // --- コピーオンライト --------------------------------------------------

    /// 複製し、パス・ルートのキャッシュとルートパラメータをリセットする
    fn fork(&self) -> Self {
        let mut next = self.clone();
        next.path = OnceLock::new();
        next.route = RouteState::Unresolved;
        next.params = ParameterBucket::new();
        next
    }

    pub fn with_protocol_version(&self, version: &str) -> Result<Self, Error> {
        let version = version_from_str(version)
            .ok_or_else(|| Error::InvalidRequest(format!("Unsupported protocol version: {}", version)))?;
        let mut next = self.fork();
        next.version = version;
        Ok(next)
    }

    /// ヘッダーを置き換える
    pub fn with_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        let (name, value) = parse_header(name, value)?;
        let mut next = self.fork();
        next.headers.insert(name, value);
        Ok(next)
    }

    /// ヘッダー値を追加する
    pub fn with_added_header(&self, name: &str, value: &str) -> Result<Self, Error> {
        let (name, value) = parse_header(name, value)?;
        let mut next = self.fork();
        next.headers.append(name, value);
        Ok(next)
    }

    pub fn without_header(&self, name: &str) -> Self {
        let mut next = self.fork();
        next.headers.remove(name);
        next
    }

    pub fn with_body(&self, body: BodyStream) -> Self {
        let mut next = self.fork();
        next.body = body;
        next
    }

    pub fn with_request_target(&self, target: &str) -> Result<Self, Error> {
        if target.is_empty() || target.chars().any(char::is_whitespace) {
            return Err(Error::InvalidRequest(format!("Invalid request target: {:?}", target)));
        }
        let mut next = self.fork();
        next.request_target = Some(target.to_string());
        Ok(next)
    }

    pub fn with_method(&self, method: &str) -> Result<Self, Error> {
        let method = http::Method::from_bytes(method.as_bytes())
            .map_err(|e| Error::InvalidRequest(format!("Invalid method {:?}: {}", method, e)))?;
        let mut next = self.fork();
        next.method = method;
        Ok(next)
    }

    /// URIを置き換える
    ///
    /// `preserve_host` が真で既に空でない `Host` がある場合を除き、
    /// 新しいURIのホストで `Host` ヘッダーを更新する。
    pub fn with_uri(&self, uri: &str, preserve_host: bool) -> Result<Self, Error> {
        let uri: Uri = uri
            .parse()
            .map_err(|e| Error::InvalidRequest(format!("Invalid URI {:?}: {}", uri, e)))?;
        let mut next = self.fork();

        let has_host = next
            .headers
            .get(HOST)
            .map(|v| !v.as_bytes().is_empty())
            .unwrap_or(false);
        if !(preserve_host && has_host) {
            if let Some(host) = uri.host() {
                let host = match uri.port_u16() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                };
                let value = HeaderValue::from_str(&host)
                    .map_err(|e| Error::InvalidHeader(format!("Invalid host {:?}: {}", host, e)))?;
                next.headers.insert(HOST, value);
            }
        }

        next.uri = uri;
        Ok(next)
    }

    pub fn with_cookie_params(&self, cookies: ParameterBucket) -> Self {
        let mut next = self.fork();
        next.cookies = cookies;
        next
    }

    /// クエリバケットを置き換える（統合ビューは query → post → put の順で再構築）
    pub fn with_query_params(&self, query: ParameterBucket) -> Self {
        let mut next = self.fork();
        next.buckets.query = query;
        let mut request = next.buckets.query.clone();
        request.merge(&next.buckets.post);
        request.merge(&next.buckets.put);
        next.buckets.request = request;
        next
    }

    pub fn with_parsed_body(&self, body: Option<Value>) -> Self {
        let mut next = self.fork();
        next.parsed_body = body;
        next
    }

    pub fn with_attribute<T: Send + Sync + 'static>(&self, name: &str, value: T) -> Self {
        let mut next = self.fork();
        next.attributes.set(name, value);
        next
    }

    pub fn without_attribute(&self, name: &str) -> Self {
        let mut next = self.fork();
        next.attributes.remove(name);
        next
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct View<'a> {
            method: &'a str,
            #[serde(rename = "type")]
            kind: Method,
            path: &'a [String],
            params: &'a ParameterBucket,
            errors: &'a [String],
            notices: &'a [Notice],
            pass_errors: &'a [String],
            pass_notices: &'a [Notice],
            #[serde(skip_serializing_if = "Option::is_none")]
            route_name: Option<&'a str>,
        }

        View {
            method: self.method(),
            kind: self.request_type(),
            path: self.path(),
            params: &self.params,
            errors: &self.errors,
            notices: &self.notices,
            pass_errors: &self.pass_errors,
            pass_notices: &self.pass_notices,
            route_name: self.route_name().filter(|name| !name.is_empty()),
        }
        .serialize(serializer)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("path", &self.path.get())
            .field("state", &self.state())
            .field("route_name", &self.route_name())
            .field("params", &self.params)
            .field("errors", &self.errors)
            .field("notices", &self.notices)
            .field("attributes", &self.attributes)
            .finish()
    }
}
