#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use marketplace_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products},
        sellers::ActiveModel as SellerActive,
        users::{ActiveModel as UserActive, Entity as Users},
    },
    integrations::{GatewayError, Mailer, OutgoingEmail, PaymentGateway},
    middleware::auth::AuthUser,
    models::{Address, KycStatus, UserRole},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, EntityTrait, Set};
use tokio::sync::OnceCell;
use uuid::Uuid;

pub const GATEWAY_SECRET: &str = "test-key-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

static MIGRATED: OnceCell<()> = OnceCell::const_new();

pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
            None
        }
    }
}

/// State backed by a fresh pool, with no gateway configured (mock payments).
pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    setup_state_with(database_url, |_| {}).await
}

pub async fn setup_state_with(
    database_url: &str,
    configure: impl FnOnce(&mut AppConfig),
) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    MIGRATED
        .get_or_try_init(|| async { run_migrations(&orm_from_pool(pool.clone())).await })
        .await?;

    let mut config = AppConfig::for_database(database_url);
    configure(&mut config);
    Ok(AppState::new(pool, config)?.without_gateway())
}

/// State wired to a [`FakeGateway`] with checkout and webhook secrets set.
pub async fn setup_gateway_state(
    database_url: &str,
    gateway: Arc<FakeGateway>,
) -> anyhow::Result<AppState> {
    let state = setup_state_with(database_url, |config| {
        config.payment.key_id = Some("rzp_test_key".into());
        config.payment.key_secret = Some(GATEWAY_SECRET.into());
        config.payment.webhook_secret = Some(WEBHOOK_SECRET.into());
    })
    .await?;
    Ok(state.with_gateway(gateway))
}

#[derive(Default)]
pub struct FakeGateway {
    pub orders: Mutex<Vec<(i64, String)>>,
    pub refunds: Mutex<Vec<(String, i64)>>,
    pub fail_refunds: std::sync::atomic::AtomicBool,
    pub fail_orders: std::sync::atomic::AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_refunds() -> Arc<Self> {
        let gateway = Self::default();
        gateway
            .fail_refunds
            .store(true, std::sync::atomic::Ordering::SeqCst);
        Arc::new(gateway)
    }

    pub fn set_orders_failing(&self, failing: bool) {
        self.fail_orders
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn refund_count(&self) -> usize {
        self.refunds.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_remote_order(
        &self,
        amount_minor: i64,
        _currency: &str,
        receipt_ref: &str,
    ) -> Result<String, GatewayError> {
        if self.fail_orders.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        let mut orders = self.orders.lock().unwrap();
        orders.push((amount_minor, receipt_ref.to_string()));
        Ok(format!("order_fake_{}", Uuid::new_v4().simple()))
    }

    async fn refund(&self, payment_ref: &str, amount_minor: i64) -> Result<String, GatewayError> {
        if self.fail_refunds.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(GatewayError::Timeout);
        }
        self.refunds
            .lock()
            .unwrap()
            .push((payment_ref.to_string(), amount_minor));
        Ok(format!("rfnd_fake_{}", Uuid::new_v4().simple()))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Emails go out on background tasks; poll briefly for them.
    pub async fn wait_for(&self, predicate: impl Fn(&OutgoingEmail) -> bool) -> bool {
        for _ in 0..50 {
            if self.sent.lock().unwrap().iter().any(&predicate) {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        false
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub async fn create_user(state: &AppState, role: UserRole) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        name: Set(format!("Test {role}")),
        email: Set(format!("{role}-{}@example.test", id.simple())),
        role: Set(role),
        wallet_balance: Set(0),
        is_blocked: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser::new(id, role))
}

pub struct SellerFixture {
    pub user: AuthUser,
    pub seller_id: Uuid,
}

pub async fn create_seller(
    state: &AppState,
    approved: bool,
    commission_percent: i32,
) -> anyhow::Result<SellerFixture> {
    let user = create_user(state, UserRole::Seller).await?;
    let seller_id = Uuid::new_v4();
    SellerActive {
        id: Set(seller_id),
        user_id: Set(user.user_id),
        store_name: Set(format!("Store {}", seller_id.simple())),
        approved: Set(approved),
        kyc_status: Set(if approved { KycStatus::Approved } else { KycStatus::Pending }),
        commission_percent: Set(commission_percent),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(SellerFixture { user, seller_id })
}

pub async fn create_product(
    state: &AppState,
    seller_id: Uuid,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    ProductActive {
        id: Set(id),
        seller_id: Set(seller_id),
        title: Set(format!("Product {}", id.simple())),
        price: Set(price),
        stock: Set(stock),
        is_active: Set(true),
        average_rating: Set(0),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(id)
}

pub async fn product_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} missing"))?;
    Ok(product.stock)
}

pub async fn wallet_balance(state: &AppState, user_id: Uuid) -> anyhow::Result<i64> {
    let user = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {user_id} missing"))?;
    Ok(user.wallet_balance)
}

pub fn address() -> Address {
    Address {
        name: "Asha".into(),
        phone: "9999999999".into(),
        house_no: "12B".into(),
        city: "Pune".into(),
        state: "MH".into(),
        pincode: "411001".into(),
        coordinates: None,
    }
}
