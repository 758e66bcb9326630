//! Integration tests for Nexus Market.
//!
//! The tests drive the real client stack (`HttpTransport`, `FileStorage`,
//! `SessionClient`, `CartStore`) against [`MockMarket`], an in-process axum
//! server that speaks the commerce API's JSON dialect on an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p nexus-market-integration-tests
//! ```
//!
//! No external services are needed.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path as UrlPath, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use nexus_market_client::ClientConfig;
use nexus_market_core::{OrderStatus, ProductId, Role, TenantId, UserId};

/// Token lifetime written into issued access tokens' `exp` claim.
const ACCESS_TOKEN_LIFETIME_SECS: i64 = 300;

// =============================================================================
// Mock server
// =============================================================================

/// A running mock commerce API.
///
/// The server is aborted when the handle is dropped.
pub struct MockMarket {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockMarket {
    /// Bind an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock API listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read mock API address");

        let app = router(Arc::clone(&state));
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock API server stopped");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// API base URL, ending in `/`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/", self.addr)
    }

    /// Client configuration pointing at this server and persisting into
    /// `storage_dir`.
    ///
    /// # Panics
    ///
    /// Panics if the base URL is rejected, which would be a bug in the mock.
    #[must_use]
    pub fn config(&self, storage_dir: &Path) -> ClientConfig {
        let mut config =
            ClientConfig::for_base_url(&self.base_url()).expect("Mock base URL is valid");
        config.storage_dir = storage_dir.to_path_buf();
        config.renewal_timeout = Duration::from_secs(2);
        config.request_timeout = Duration::from_secs(5);
        config
    }

    /// Register a shop directly.
    #[must_use]
    pub fn add_tenant(&self, name: &str) -> TenantId {
        let mut market = self.state.market();
        market.insert_tenant(name, &slug(name))
    }

    /// Register an account directly. Sellers pass their shop.
    pub fn add_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
        tenant: Option<TenantId>,
    ) -> UserId {
        let mut market = self.state.market();
        market.insert_user(username, password, role, tenant)
    }

    /// List a product directly.
    ///
    /// # Panics
    ///
    /// Panics if `price` is not a decimal literal.
    #[must_use]
    pub fn add_product(&self, tenant: TenantId, name: &str, price: &str, stock: i64) -> ProductId {
        let price: Decimal = price.parse().expect("Test price must be a decimal");
        let mut market = self.state.market();
        let id = market.allocate_id();
        market.products.insert(
            id,
            MockProduct {
                id,
                tenant: tenant.as_i64(),
                name: name.to_string(),
                description: String::new(),
                price,
                stock,
            },
        );
        ProductId::new(id)
    }

    /// Change a product's price behind the client's back.
    ///
    /// # Panics
    ///
    /// Panics if `price` is not a decimal literal.
    pub fn set_price(&self, id: ProductId, price: &str) {
        let price: Decimal = price.parse().expect("Test price must be a decimal");
        if let Some(product) = self.state.market().products.get_mut(&id.as_i64()) {
            product.price = price;
        }
    }

    /// Current stock of a product.
    #[must_use]
    pub fn stock(&self, id: ProductId) -> Option<i64> {
        self.state
            .market()
            .products
            .get(&id.as_i64())
            .map(|product| product.stock)
    }

    /// Number of orders on record.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.state.market().orders.len()
    }

    /// Invalidate every issued access token. Refresh tokens stay valid.
    pub fn expire_access_tokens(&self) {
        self.state.market().access_tokens.clear();
    }

    /// Make the refresh endpoint reject every token.
    pub fn reject_refresh(&self) {
        self.state.market().reject_refresh = true;
    }

    /// Issue a new refresh token with every renewal.
    pub fn rotate_refresh_tokens(&self) {
        self.state.market().rotate_refresh = true;
    }

    /// Delay applied to every refresh response.
    pub fn set_refresh_delay(&self, delay: Duration) {
        self.state.market().refresh_delay = delay;
    }

    /// Requests received for `method` and a path relative to the API base,
    /// e.g. `hits("POST", "auth/refresh/")`.
    #[must_use]
    pub fn hits(&self, method: &str, path: &str) -> usize {
        let key = format!("{method} /api/{path}");
        self.state.market().hits.get(&key).copied().unwrap_or(0)
    }
}

impl Drop for MockMarket {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl std::fmt::Debug for MockMarket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockMarket")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// State
// =============================================================================

#[derive(Default)]
struct MockState {
    market: Mutex<Market>,
}

impl MockState {
    fn market(&self) -> MutexGuard<'_, Market> {
        self.market.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct Market {
    next_id: i64,
    users: HashMap<String, MockUser>,
    tenants: BTreeMap<i64, MockTenant>,
    products: BTreeMap<i64, MockProduct>,
    orders: BTreeMap<i64, MockOrder>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashMap<String, String>,
    reject_refresh: bool,
    rotate_refresh: bool,
    refresh_delay: Duration,
    hits: HashMap<String, usize>,
}

struct MockUser {
    id: i64,
    password: String,
    role: Role,
    tenant: Option<i64>,
}

struct MockTenant {
    id: i64,
    name: String,
    subdomain: String,
}

struct MockProduct {
    id: i64,
    tenant: i64,
    name: String,
    description: String,
    price: Decimal,
    stock: i64,
}

struct MockOrder {
    id: i64,
    tenant: i64,
    customer: i64,
    status: OrderStatus,
    items: Vec<MockOrderItem>,
}

struct MockOrderItem {
    product: i64,
    product_name: String,
    quantity: u32,
    price: Decimal,
}

impl Market {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_tenant(&mut self, name: &str, subdomain: &str) -> TenantId {
        let id = self.allocate_id();
        self.tenants.insert(
            id,
            MockTenant {
                id,
                name: name.to_string(),
                subdomain: subdomain.to_string(),
            },
        );
        TenantId::new(id)
    }

    fn insert_user(
        &mut self,
        username: &str,
        password: &str,
        role: Role,
        tenant: Option<TenantId>,
    ) -> UserId {
        let id = self.allocate_id();
        self.users.insert(
            username.to_string(),
            MockUser {
                id,
                password: password.to_string(),
                role,
                tenant: tenant.map(|t| t.as_i64()),
            },
        );
        UserId::new(id)
    }

    fn issue_access(&mut self, username: &str) -> String {
        let serial = self.allocate_id();
        let Some(user) = self.users.get(username) else {
            return String::new();
        };
        let tenant_name = user
            .tenant
            .and_then(|id| self.tenants.get(&id))
            .map(|tenant| tenant.name.clone());
        let claims = json!({
            "user_id": user.id,
            "username": username,
            "role": user.role,
            "tenant_id": user.tenant,
            "tenant_name": tenant_name,
            "exp": unix_now() + ACCESS_TOKEN_LIFETIME_SECS,
            "jti": serial,
        });
        let token = unsigned_token(&claims);
        self.access_tokens
            .insert(token.clone(), username.to_string());
        token
    }

    fn issue_refresh(&mut self, username: &str) -> String {
        let token = format!("refresh-{}", self.allocate_id());
        self.refresh_tokens
            .insert(token.clone(), username.to_string());
        token
    }

    fn product_json(&self, product: &MockProduct) -> Value {
        json!({
            "id": product.id,
            "tenant": product.tenant,
            "tenant_name": self.tenants.get(&product.tenant).map(|t| t.name.clone()),
            "name": product.name,
            "description": product.description,
            "price": product.price.to_string(),
            "stock": product.stock,
            "created_at": "2024-03-01T12:00:00Z",
        })
    }
}

fn tenant_json(tenant: &MockTenant) -> Value {
    json!({
        "id": tenant.id,
        "name": tenant.name,
        "subdomain": tenant.subdomain,
        "domain_url": null,
        "created_at": "2024-02-01T09:00:00Z",
    })
}

fn order_json(order: &MockOrder) -> Value {
    let total: Decimal = order
        .items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();
    json!({
        "id": order.id,
        "tenant": order.tenant,
        "customer": order.customer,
        "status": order.status,
        "total_amount": total.to_string(),
        "created_at": "2024-03-02T08:30:00Z",
        "items": order.items.iter().map(|item| json!({
            "product": item.product,
            "product_name": item.product_name,
            "quantity": item.quantity,
            "price": item.price.to_string(),
        })).collect::<Vec<_>>(),
    })
}

fn unsigned_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.mock")
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/api/auth/login/", post(login))
        .route("/api/auth/refresh/", post(refresh))
        .route("/api/auth/register/", post(register))
        .route("/api/products/", get(list_products).post(create_product))
        .route(
            "/api/products/{id}/",
            get(show_product).patch(update_product).delete(delete_product),
        )
        .route("/api/tenants/", get(list_tenants).post(create_tenant))
        .route("/api/tenants/{id}/", get(show_tenant))
        .route("/api/orders/", get(list_orders).post(place_order))
        .route("/api/orders/{id}/", axum::routing::patch(update_order))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            count_requests,
        ))
        .with_state(state)
}

async fn count_requests(
    State(state): State<Arc<MockState>>,
    request: Request,
    next: Next,
) -> Response {
    let key = format!("{} {}", request.method(), request.uri().path());
    *state.market().hits.entry(key).or_default() += 1;
    next.run(request).await
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid",
        })),
    )
        .into_response()
}

fn forbidden() -> Response {
    detail(
        StatusCode::FORBIDDEN,
        "You do not have permission to perform this action.",
    )
}

fn not_found() -> Response {
    detail(StatusCode::NOT_FOUND, "Not found.")
}

/// Resolve the bearer to a username. An invalid token is rejected even on
/// public endpoints.
fn bearer_user(market: &Market, headers: &HeaderMap) -> Result<Option<String>, Response> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(unauthorized)?;
    market
        .access_tokens
        .get(token)
        .cloned()
        .map(Some)
        .ok_or_else(unauthorized)
}

fn require_user(market: &Market, headers: &HeaderMap) -> Result<String, Response> {
    bearer_user(market, headers)?.ok_or_else(|| {
        detail(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.",
        )
    })
}

/// The caller's shop, when the caller is an owner or staff member.
fn require_seller_tenant(market: &Market, headers: &HeaderMap) -> Result<i64, Response> {
    let username = require_user(market, headers)?;
    market
        .users
        .get(&username)
        .filter(|user| user.role.is_seller())
        .and_then(|user| user.tenant)
        .ok_or_else(forbidden)
}

fn str_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}

fn decimal_field(body: &Value, key: &str) -> Option<Decimal> {
    match body.get(key)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Auth
// -----------------------------------------------------------------------------

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let mut market = state.market();
    let username = str_field(&body, "username").unwrap_or_default();
    let password = str_field(&body, "password").unwrap_or_default();

    let valid = market
        .users
        .get(username)
        .is_some_and(|user| user.password == password);
    if !valid {
        return detail(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        );
    }

    let access = market.issue_access(username);
    let refresh = market.issue_refresh(username);
    Json(json!({ "access": access, "refresh": refresh })).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let delay = state.market().refresh_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut market = state.market();
    let presented = str_field(&body, "refresh").unwrap_or_default().to_string();
    let username = match market.refresh_tokens.get(&presented) {
        Some(username) if !market.reject_refresh => username.clone(),
        _ => return unauthorized(),
    };

    let access = market.issue_access(&username);
    if market.rotate_refresh {
        market.refresh_tokens.remove(&presented);
        let refresh = market.issue_refresh(&username);
        return Json(json!({ "access": access, "refresh": refresh })).into_response();
    }
    Json(json!({ "access": access })).into_response()
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let mut market = state.market();
    let Some(username) = str_field(&body, "username").filter(|u| !u.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Username is required");
    };
    let password = str_field(&body, "password").unwrap_or_default();
    let role = body
        .get("role")
        .and_then(|role| serde_json::from_value::<Role>(role.clone()).ok())
        .unwrap_or_default();

    if market.users.contains_key(username) {
        return error(StatusCode::BAD_REQUEST, "Username already exists");
    }

    market.insert_user(username, password, role, None);
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "username": username,
        })),
    )
        .into_response()
}

// -----------------------------------------------------------------------------
// Catalog
// -----------------------------------------------------------------------------

async fn list_products(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let market = state.market();
    if let Err(rejection) = bearer_user(&market, &headers) {
        return rejection;
    }

    let tenant: Option<i64> = query.get("tenant").and_then(|t| t.parse().ok());
    let products: Vec<Value> = market
        .products
        .values()
        .filter(|product| tenant.is_none_or(|t| product.tenant == t))
        .map(|product| market.product_json(product))
        .collect();
    Json(products).into_response()
}

async fn show_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
) -> Response {
    let market = state.market();
    if let Err(rejection) = bearer_user(&market, &headers) {
        return rejection;
    }

    market
        .products
        .get(&id)
        .map_or_else(not_found, |product| {
            Json(market.product_json(product)).into_response()
        })
}

async fn create_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut market = state.market();
    let tenant = match require_seller_tenant(&market, &headers) {
        Ok(tenant) => tenant,
        Err(rejection) => return rejection,
    };
    let (Some(name), Some(price)) = (str_field(&body, "name"), decimal_field(&body, "price"))
    else {
        return error(StatusCode::BAD_REQUEST, "name and price are required");
    };

    let id = market.allocate_id();
    let product = MockProduct {
        id,
        tenant,
        name: name.to_string(),
        description: str_field(&body, "description")
            .unwrap_or_default()
            .to_string(),
        price,
        stock: body.get("stock").and_then(Value::as_i64).unwrap_or(0),
    };
    let response = market.product_json(&product);
    market.products.insert(id, product);
    (StatusCode::CREATED, Json(response)).into_response()
}

async fn update_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut market = state.market();
    let tenant = match require_seller_tenant(&market, &headers) {
        Ok(tenant) => tenant,
        Err(rejection) => return rejection,
    };

    let Some(product) = market.products.get_mut(&id) else {
        return not_found();
    };
    if product.tenant != tenant {
        return forbidden();
    }
    if let Some(name) = str_field(&body, "name") {
        product.name = name.to_string();
    }
    if let Some(description) = str_field(&body, "description") {
        product.description = description.to_string();
    }
    if let Some(price) = decimal_field(&body, "price") {
        product.price = price;
    }
    if let Some(stock) = body.get("stock").and_then(Value::as_i64) {
        product.stock = stock;
    }

    market
        .products
        .get(&id)
        .map_or_else(not_found, |product| {
            Json(market.product_json(product)).into_response()
        })
}

async fn delete_product(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
) -> Response {
    let mut market = state.market();
    let tenant = match require_seller_tenant(&market, &headers) {
        Ok(tenant) => tenant,
        Err(rejection) => return rejection,
    };

    match market.products.get(&id) {
        None => not_found(),
        Some(product) if product.tenant != tenant => forbidden(),
        Some(_) => {
            market.products.remove(&id);
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

async fn list_tenants(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let market = state.market();
    if let Err(rejection) = bearer_user(&market, &headers) {
        return rejection;
    }
    let tenants: Vec<Value> = market.tenants.values().map(tenant_json).collect();
    Json(tenants).into_response()
}

async fn show_tenant(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
) -> Response {
    let market = state.market();
    if let Err(rejection) = bearer_user(&market, &headers) {
        return rejection;
    }
    market
        .tenants
        .get(&id)
        .map_or_else(not_found, |tenant| Json(tenant_json(tenant)).into_response())
}

async fn create_tenant(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut market = state.market();
    let username = match require_user(&market, &headers) {
        Ok(username) => username,
        Err(rejection) => return rejection,
    };
    let Some(name) = str_field(&body, "name").filter(|n| !n.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Shop name is required");
    };
    let subdomain = str_field(&body, "subdomain").map_or_else(|| slug(name), ToString::to_string);
    if market.tenants.values().any(|t| t.subdomain == subdomain) {
        return error(StatusCode::BAD_REQUEST, "Subdomain already taken");
    }

    let id = market.insert_tenant(name, &subdomain);
    if let Some(user) = market.users.get_mut(&username) {
        user.role = Role::Owner;
        user.tenant = Some(id.as_i64());
    }
    market
        .tenants
        .get(&id.as_i64())
        .map_or_else(not_found, |tenant| {
            (StatusCode::CREATED, Json(tenant_json(tenant))).into_response()
        })
}

// -----------------------------------------------------------------------------
// Orders
// -----------------------------------------------------------------------------

async fn list_orders(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let market = state.market();
    let username = match require_user(&market, &headers) {
        Ok(username) => username,
        Err(rejection) => return rejection,
    };
    let Some(user) = market.users.get(&username) else {
        return unauthorized();
    };

    let orders: Vec<Value> = market
        .orders
        .values()
        .filter(|order| {
            if user.role.is_seller() {
                user.tenant == Some(order.tenant)
            } else {
                order.customer == user.id
            }
        })
        .map(order_json)
        .collect();
    Json(orders).into_response()
}

/// Validates every line before touching stock, then creates one order per
/// shop.
async fn place_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut market = state.market();
    let username = match require_user(&market, &headers) {
        Ok(username) => username,
        Err(rejection) => return rejection,
    };
    let Some(customer) = market.users.get(&username).map(|user| user.id) else {
        return unauthorized();
    };

    let lines = body
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if lines.is_empty() {
        return error(StatusCode::BAD_REQUEST, "Order must contain items");
    }

    let mut by_tenant: BTreeMap<i64, Vec<MockOrderItem>> = BTreeMap::new();
    for line in &lines {
        let product_id = line.get("product_id").and_then(Value::as_i64);
        let quantity = line
            .get("quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok())
            .filter(|q| *q > 0);
        let (Some(product_id), Some(quantity)) = (product_id, quantity) else {
            return error(StatusCode::BAD_REQUEST, "Invalid order line");
        };
        let Some(product) = market.products.get(&product_id) else {
            return error(
                StatusCode::BAD_REQUEST,
                &format!("Product {product_id} not found"),
            );
        };
        if product.stock < i64::from(quantity) {
            return error(
                StatusCode::BAD_REQUEST,
                &format!("Insufficient stock for {}", product.name),
            );
        }
        by_tenant
            .entry(product.tenant)
            .or_default()
            .push(MockOrderItem {
                product: product.id,
                product_name: product.name.clone(),
                quantity,
                price: product.price,
            });
    }

    let mut created = Vec::new();
    for (tenant, items) in by_tenant {
        for item in &items {
            if let Some(product) = market.products.get_mut(&item.product) {
                product.stock -= i64::from(item.quantity);
            }
        }
        let id = market.allocate_id();
        let order = MockOrder {
            id,
            tenant,
            customer,
            status: OrderStatus::Pending,
            items,
        };
        created.push(order_json(&order));
        market.orders.insert(id, order);
    }

    (StatusCode::CREATED, Json(created)).into_response()
}

async fn update_order(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    UrlPath(id): UrlPath<i64>,
    Json(body): Json<Value>,
) -> Response {
    let mut market = state.market();
    let tenant = match require_seller_tenant(&market, &headers) {
        Ok(tenant) => tenant,
        Err(rejection) => return rejection,
    };
    let Some(status) = body
        .get("status")
        .and_then(|s| serde_json::from_value::<OrderStatus>(s.clone()).ok())
        .filter(|s| *s != OrderStatus::Other)
    else {
        return error(StatusCode::BAD_REQUEST, "Invalid status");
    };

    match market.orders.get_mut(&id) {
        None => not_found(),
        Some(order) if order.tenant != tenant => forbidden(),
        Some(order) => {
            order.status = status;
            Json(order_json(order)).into_response()
        }
    }
}
