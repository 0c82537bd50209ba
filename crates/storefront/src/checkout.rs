//! Checkout orchestration across the payment redirect.
//!
//! A checkout spans two page loads. [`Checkout::begin`] saves the order,
//! remembers its id in session storage and sends the customer to the
//! gateway. When the gateway redirects back with a `reference` query
//! parameter, a fresh orchestrator calls [`Checkout::resume`] to verify the
//! payment, mark the order completed and clear the cart.
//!
//! ```text
//! Idle -> OrderSaving -> AwaitingGatewayRedirect      (page load 1)
//! Idle -> AwaitingVerification -> Reconciling -> Done (page load 2)
//!         any step -> Failed
//! ```
//!
//! There is no retry and no compensation: a captured payment whose order
//! update fails is logged at `error` with both ids for manual reconciliation.

use std::sync::Arc;

use chrono::Utc;
use geomancy_core::{
    CurrencyCode, Email, InitializeTransactionRequest, OrderDraft, OrderId, OrderPatch,
    RelayLineItem, ShippingAddress, TransactionReference,
};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cart::Cart;
use crate::error::{CheckoutError, GatewayPhase, ValidationError, add_breadcrumb};
use crate::orders::OrderStore;
use crate::relay_client::PaymentRelay;
use crate::storage::KeyValueStore;

/// Session storage key holding the id of the order awaiting payment.
pub const PENDING_ORDER_KEY: &str = "pendingOrderId";

/// Where the customer lands after a completed checkout.
pub const CONFIRMATION_PATH: &str = "/checkout-success";

/// Moves the customer to another page.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Severity of a [`Notifier`] message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Shows short messages to the customer (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

impl<T: Navigator> Navigator for Arc<T> {
    fn navigate(&self, url: &str) {
        (**self).navigate(url);
    }
}

impl<T: Notifier> Notifier for Arc<T> {
    fn notify(&self, level: NoticeLevel, message: &str) {
        (**self).notify(level, message);
    }
}

/// Where a checkout currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    OrderSaving,
    /// The customer has been sent to the gateway. Nothing more happens on
    /// this page load.
    AwaitingGatewayRedirect {
        order_id: OrderId,
        reference: TransactionReference,
        authorization_url: String,
    },
    AwaitingVerification {
        reference: TransactionReference,
    },
    Reconciling {
        order_id: OrderId,
        reference: TransactionReference,
    },
    Done {
        order_id: OrderId,
        reference: TransactionReference,
    },
    Failed {
        reason: String,
    },
}

impl CheckoutState {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::OrderSaving => "order_saving",
            Self::AwaitingGatewayRedirect { .. } => "awaiting_gateway_redirect",
            Self::AwaitingVerification { .. } => "awaiting_verification",
            Self::Reconciling { .. } => "reconciling",
            Self::Done { .. } => "done",
            Self::Failed { .. } => "failed",
        }
    }
}

/// What the customer submitted on the checkout form.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub email: String,
    pub shipping_address: ShippingAddress,
}

/// A checkout that reached the gateway redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedCheckout {
    pub order_id: OrderId,
    pub reference: TransactionReference,
    pub authorization_url: String,
}

/// A checkout whose payment was verified and recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub order_id: OrderId,
    pub reference: TransactionReference,
}

/// The checkout state machine for one page load.
pub struct Checkout<S, R, N, T> {
    orders: S,
    relay: R,
    navigator: N,
    notifier: T,
    session: Arc<dyn KeyValueStore>,
    currency: CurrencyCode,
    state: CheckoutState,
}

impl<S, R, N, T> Checkout<S, R, N, T>
where
    S: OrderStore,
    R: PaymentRelay,
    N: Navigator,
    T: Notifier,
{
    pub fn new(
        orders: S,
        relay: R,
        navigator: N,
        notifier: T,
        session: Arc<dyn KeyValueStore>,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            orders,
            relay,
            navigator,
            notifier,
            session,
            currency,
            state: CheckoutState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Save the order, start the payment and redirect to the gateway.
    ///
    /// The cart is left untouched; it is cleared only after the payment has
    /// been verified on return.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without any state change or network call for an
    /// empty cart, a bad email or a checkout already under way; the customer
    /// is still notified. Any later failure halts the machine in `Failed` and
    /// notifies the customer.
    pub async fn begin(
        &mut self,
        cart: &Cart,
        request: CheckoutRequest,
    ) -> Result<StartedCheckout, CheckoutError> {
        let email = match self.validate(cart, &request) {
            Ok(email) => email,
            Err(e) => {
                let err = CheckoutError::Validation(e);
                debug!(error = %err, "Checkout rejected");
                self.notifier.notify(NoticeLevel::Error, &err.user_message());
                return Err(err);
            }
        };

        self.transition(CheckoutState::OrderSaving);

        let lines = cart.snapshot();
        let draft = OrderDraft::from_cart(
            email.clone(),
            request.shipping_address.clone(),
            &lines,
            Utc::now(),
        );
        let total = draft.total_amount;

        let order_id = match self.orders.create(draft).await {
            Ok(id) => id,
            Err(e) => return Err(self.fail(CheckoutError::Storage(e))),
        };
        add_breadcrumb("checkout", "Order saved", Some(&[("order_id", order_id.as_str())]));

        if let Err(e) = self.session.set(PENDING_ORDER_KEY, order_id.as_str()) {
            self.abandon_order(&order_id).await;
            return Err(self.fail(CheckoutError::Session(e)));
        }

        let relay_request = InitializeTransactionRequest {
            items: Some(
                lines
                    .iter()
                    .map(|line| RelayLineItem {
                        price: line.unit_price,
                        qty: line.quantity.get(),
                    })
                    .collect(),
            ),
            email: email.to_string(),
            shipping_address: Some(request.shipping_address),
            description: Some(format!(
                "Payment of {} from {email}",
                total.display(self.currency)
            )),
        };

        let initialized = match self.relay.initialize_transaction(&relay_request).await {
            Ok(response) => response,
            Err(source) => {
                if let Err(e) = self.session.remove(PENDING_ORDER_KEY) {
                    warn!(error = %e, "Failed to clear pending order id");
                }
                self.abandon_order(&order_id).await;
                return Err(self.fail(CheckoutError::Gateway {
                    phase: GatewayPhase::Initialize,
                    source,
                }));
            }
        };

        let started = StartedCheckout {
            order_id,
            reference: initialized.reference,
            authorization_url: initialized.authorization_url,
        };
        self.transition(CheckoutState::AwaitingGatewayRedirect {
            order_id: started.order_id.clone(),
            reference: started.reference.clone(),
            authorization_url: started.authorization_url.clone(),
        });
        self.navigator.navigate(&started.authorization_url);

        Ok(started)
    }

    /// Resume after the gateway redirect, reading `reference` from the URL.
    ///
    /// # Errors
    ///
    /// See [`Checkout::resume`].
    pub async fn resume_from_url(
        &mut self,
        cart: &mut Cart,
        url: &Url,
    ) -> Result<Option<CompletedCheckout>, CheckoutError> {
        let reference = url
            .query_pairs()
            .find(|(key, _)| key == "reference")
            .map(|(_, value)| value.into_owned());
        self.resume(cart, reference.as_deref()).await
    }

    /// Verify the payment behind `reference` and complete the pending order.
    ///
    /// Without a reference nothing happens and `Ok(None)` is returned.
    ///
    /// # Errors
    ///
    /// Halts in `Failed`, leaving the order `PendingPayment`, when
    /// verification fails or is declined, or when this session holds no
    /// pending order. Returns `Reconciliation` if the payment succeeded but
    /// the order update failed.
    pub async fn resume(
        &mut self,
        cart: &mut Cart,
        reference: Option<&str>,
    ) -> Result<Option<CompletedCheckout>, CheckoutError> {
        let Some(reference) = reference
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(TransactionReference::new)
        else {
            return Ok(None);
        };

        self.transition(CheckoutState::AwaitingVerification {
            reference: reference.clone(),
        });

        let outcome = match self.relay.verify_transaction(&reference).await {
            Ok(outcome) => outcome,
            Err(source) => {
                return Err(self.fail(CheckoutError::Gateway {
                    phase: GatewayPhase::Verify,
                    source,
                }));
            }
        };
        if !outcome.status.is_success() {
            return Err(self.fail(CheckoutError::Verification(outcome.message)));
        }

        let order_id = match self.session.get(PENDING_ORDER_KEY) {
            Ok(Some(id)) if !id.is_empty() => OrderId::new(id),
            Ok(_) => {
                return Err(self.fail(CheckoutError::MissingPendingOrder { reference }));
            }
            Err(e) => {
                warn!(error = %e, "Failed to read pending order id");
                return Err(self.fail(CheckoutError::MissingPendingOrder { reference }));
            }
        };

        self.transition(CheckoutState::Reconciling {
            order_id: order_id.clone(),
            reference: reference.clone(),
        });

        if let Err(source) = self
            .orders
            .update(&order_id, OrderPatch::completed(reference.clone(), Utc::now()))
            .await
        {
            error!(
                order_id = %order_id,
                reference = %reference,
                error = %source,
                "Payment captured but order not updated; reconcile manually"
            );
            return Err(self.fail(CheckoutError::Reconciliation {
                order_id,
                reference,
                source,
            }));
        }

        cart.clear();
        if let Err(e) = self.session.remove(PENDING_ORDER_KEY) {
            warn!(error = %e, "Failed to clear pending order id");
        }

        self.transition(CheckoutState::Done {
            order_id: order_id.clone(),
            reference: reference.clone(),
        });
        self.notifier
            .notify(NoticeLevel::Success, "Payment successful, thank you for your order!");
        self.navigator.navigate(CONFIRMATION_PATH);

        Ok(Some(CompletedCheckout {
            order_id,
            reference,
        }))
    }

    /// Best-effort: mark an order that will never be paid as `Failed`.
    async fn abandon_order(&self, order_id: &OrderId) {
        if let Err(e) = self
            .orders
            .update(order_id, OrderPatch::failed(Utc::now()))
            .await
        {
            warn!(order_id = %order_id, error = %e, "Failed to mark order as failed");
        }
    }

    fn transition(&mut self, next: CheckoutState) {
        info!(from = self.state.name(), to = next.name(), "Checkout transition");
        add_breadcrumb("checkout", next.name(), None);
        self.state = next;
    }

    fn validate(&self, cart: &Cart, request: &CheckoutRequest) -> Result<Email, ValidationError> {
        if matches!(
            self.state,
            CheckoutState::OrderSaving | CheckoutState::AwaitingGatewayRedirect { .. }
        ) {
            return Err(ValidationError::CheckoutInProgress);
        }
        if cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        Email::parse(&request.email).map_err(ValidationError::from)
    }

    fn fail(&mut self, err: CheckoutError) -> CheckoutError {
        warn!(error = %err, retryable = err.is_retryable(), "Checkout failed");
        self.transition(CheckoutState::Failed {
            reason: err.to_string(),
        });
        self.notifier.notify(NoticeLevel::Error, &err.user_message());
        err
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geomancy_core::{
        Email, InitializeTransactionResponse, MinorUnits, Order, OrderStatus, ProductId,
        VerificationStatus,
    };

    use super::*;
    use crate::orders::{MemoryOrderStore, OrderStoreError};
    use crate::relay_client::{RelayClientError, VerificationOutcome};
    use crate::storage::MemoryStorage;

    /// Everything observable, in call order.
    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, event: impl Into<String>) {
            self.events.lock().unwrap().push(event.into());
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    struct ScriptedRelay {
        journal: Arc<Journal>,
        session: Arc<MemoryStorage>,
        initialize_fails: bool,
        verify: Option<VerificationStatus>,
        initialized: AtomicUsize,
        requests: Mutex<Vec<InitializeTransactionRequest>>,
    }

    impl PaymentRelay for ScriptedRelay {
        async fn initialize_transaction(
            &self,
            request: &InitializeTransactionRequest,
        ) -> Result<InitializeTransactionResponse, RelayClientError> {
            let pending = self.session.get(PENDING_ORDER_KEY).unwrap();
            self.journal
                .push(format!("initialize pending={}", pending.unwrap_or_default()));
            self.initialized.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if self.initialize_fails {
                return Err(RelayClientError::Api {
                    status: 500,
                    message: "Transaction initialization failed".to_string(),
                });
            }
            Ok(InitializeTransactionResponse {
                authorization_url: "https://checkout.test/ref_123".to_string(),
                reference: TransactionReference::new("ref_123"),
            })
        }

        async fn verify_transaction(
            &self,
            reference: &TransactionReference,
        ) -> Result<VerificationOutcome, RelayClientError> {
            self.journal.push(format!("verify {reference}"));
            match self.verify {
                Some(status) => Ok(VerificationOutcome {
                    status,
                    message: if status.is_success() {
                        "Transaction verified successfully".to_string()
                    } else {
                        "Transaction verification failed".to_string()
                    },
                    data: None,
                }),
                None => Err(RelayClientError::Api {
                    status: 500,
                    message: "Failed to verify transaction".to_string(),
                }),
            }
        }
    }

    /// Order store that journals updates and can refuse them.
    struct JournaledStore {
        inner: MemoryOrderStore,
        journal: Arc<Journal>,
        cart_storage: Arc<MemoryStorage>,
        fail_create: bool,
        fail_update: bool,
    }

    impl OrderStore for JournaledStore {
        async fn create(&self, draft: OrderDraft) -> Result<OrderId, OrderStoreError> {
            self.journal.push("create");
            if self.fail_create {
                return Err(OrderStoreError::Storage("insert denied".to_string()));
            }
            self.inner.create(draft).await
        }

        async fn update(&self, id: &OrderId, patch: OrderPatch) -> Result<Order, OrderStoreError> {
            let cart = self.cart_storage.get("cart").unwrap().unwrap_or_default();
            let status = patch.status.map(|s| s.to_string()).unwrap_or_default();
            self.journal
                .push(format!("update {id} {status} cart_empty={}", cart == "[]"));
            if self.fail_update {
                return Err(OrderStoreError::NotFound(id.clone()));
            }
            self.inner.update(id, patch).await
        }

        async fn get(&self, id: &OrderId) -> Result<Order, OrderStoreError> {
            self.inner.get(id).await
        }

        async fn list(&self) -> Result<Vec<Order>, OrderStoreError> {
            self.inner.list().await
        }

        async fn list_for_customer(&self, email: &Email) -> Result<Vec<Order>, OrderStoreError> {
            self.inner.list_for_customer(email).await
        }
    }

    struct Recorder {
        journal: Arc<Journal>,
    }

    impl Navigator for Recorder {
        fn navigate(&self, url: &str) {
            self.journal.push(format!("navigate {url}"));
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, level: NoticeLevel, message: &str) {
            self.journal.push(format!("notify {level:?} {message}"));
        }
    }

    struct Harness {
        journal: Arc<Journal>,
        session: Arc<MemoryStorage>,
        local: Arc<MemoryStorage>,
        store: Arc<JournaledStore>,
        relay: Arc<ScriptedRelay>,
    }

    #[derive(Default, Clone, Copy)]
    struct Script {
        fail_create: bool,
        fail_update: bool,
        initialize_fails: bool,
        verify: Option<VerificationStatus>,
    }

    impl Harness {
        fn new(script: Script) -> Self {
            let journal = Arc::new(Journal::default());
            let session = Arc::new(MemoryStorage::new());
            let local = Arc::new(MemoryStorage::new());
            let store = Arc::new(JournaledStore {
                inner: MemoryOrderStore::new(),
                journal: journal.clone(),
                cart_storage: local.clone(),
                fail_create: script.fail_create,
                fail_update: script.fail_update,
            });
            let relay = Arc::new(ScriptedRelay {
                journal: journal.clone(),
                session: session.clone(),
                initialize_fails: script.initialize_fails,
                verify: script.verify,
                initialized: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            });
            Self {
                journal,
                session,
                local,
                store,
                relay,
            }
        }

        fn checkout(
            &self,
        ) -> Checkout<Arc<JournaledStore>, Arc<ScriptedRelay>, Recorder, Recorder> {
            Checkout::new(
                self.store.clone(),
                self.relay.clone(),
                Recorder {
                    journal: self.journal.clone(),
                },
                Recorder {
                    journal: self.journal.clone(),
                },
                self.session.clone(),
                CurrencyCode::GHS,
            )
        }

        fn cart(&self) -> Cart {
            Cart::load(self.local.clone())
        }

        fn filled_cart(&self) -> Cart {
            let mut cart = self.cart();
            cart.add(ProductId::new("p1"), MinorUnits::new(500));
            cart.add(ProductId::new("p1"), MinorUnits::new(500));
            cart
        }
    }

    fn request(email: &str) -> CheckoutRequest {
        CheckoutRequest {
            email: email.to_string(),
            shipping_address: ShippingAddress {
                name: "Ama Mensah".to_string(),
                line1: "1 Ring Road".to_string(),
                city: "Accra".to_string(),
                country: "GH".to_string(),
                ..Default::default()
            },
        }
    }

    fn success() -> Script {
        Script {
            verify: Some(VerificationStatus::Success),
            ..Script::default()
        }
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_without_side_effects() {
        let harness = Harness::new(success());
        let mut checkout = harness.checkout();

        let err = checkout
            .begin(&harness.cart(), request("a@b.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(ValidationError::EmptyCart)));
        assert_eq!(checkout.state(), &CheckoutState::Idle);
        assert_eq!(harness.journal.events(), ["notify Error your cart is empty"]);
        assert_eq!(harness.relay.initialized.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_email_is_rejected_without_side_effects() {
        let harness = Harness::new(success());
        let mut checkout = harness.checkout();

        let err = checkout
            .begin(&harness.filled_cart(), request("   "))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Validation(ValidationError::InvalidEmail(_))));
        assert_eq!(checkout.state(), &CheckoutState::Idle);
        let events = harness.journal.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("notify Error invalid email address"));
        assert_eq!(harness.relay.initialized.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_begin_while_awaiting_gateway_is_rejected() {
        let harness = Harness::new(success());
        let mut checkout = harness.checkout();
        checkout
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap();
        let before = harness.journal.events().len();

        let err = checkout
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Validation(ValidationError::CheckoutInProgress)
        ));
        assert!(matches!(checkout.state(), CheckoutState::AwaitingGatewayRedirect { .. }));
        assert_eq!(
            harness.journal.events()[before..],
            ["notify Error a checkout is already awaiting payment"]
        );
        assert_eq!(harness.relay.initialized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_begin_stores_order_id_before_navigating() {
        let harness = Harness::new(success());
        let mut checkout = harness.checkout();

        let started = checkout
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap();

        assert_eq!(started.order_id.as_str(), "o1");
        assert_eq!(started.reference.as_str(), "ref_123");
        assert_eq!(
            harness.journal.events(),
            [
                "create",
                "initialize pending=o1",
                "navigate https://checkout.test/ref_123",
            ]
        );
        assert_eq!(
            harness.session.get(PENDING_ORDER_KEY).unwrap().as_deref(),
            Some("o1")
        );
        assert!(matches!(
            checkout.state(),
            CheckoutState::AwaitingGatewayRedirect { order_id, .. } if order_id.as_str() == "o1"
        ));

        let order = harness.store.get(&started.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.total_amount, MinorUnits::new(1000));
        assert!(!harness.cart().is_empty());
    }

    #[tokio::test]
    async fn test_begin_sends_items_and_description() {
        let harness = Harness::new(success());
        let mut checkout = harness.checkout();

        checkout
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap();

        let requests = harness.relay.requests.lock().unwrap().clone();
        let sent = requests.first().unwrap();
        assert_eq!(
            sent.items.as_deref(),
            Some(
                &[RelayLineItem {
                    price: MinorUnits::new(500),
                    qty: 2
                }][..]
            )
        );
        assert_eq!(sent.email, "a@b.com");
        assert_eq!(
            sent.description.as_deref(),
            Some("Payment of GH₵10.00 from a@b.com")
        );
        assert_eq!(sent.shipping_address.as_ref().unwrap().city, "Accra");
    }

    #[tokio::test]
    async fn test_create_failure_never_reaches_gateway() {
        let harness = Harness::new(Script {
            fail_create: true,
            ..success()
        });
        let mut checkout = harness.checkout();

        let err = checkout
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Storage(_)));
        assert!(err.is_retryable());
        assert_eq!(harness.relay.initialized.load(Ordering::SeqCst), 0);
        assert!(matches!(checkout.state(), CheckoutState::Failed { .. }));
        assert_eq!(harness.session.get(PENDING_ORDER_KEY).unwrap(), None);
        assert!(
            harness
                .journal
                .events()
                .iter()
                .any(|e| e.starts_with("notify Error"))
        );
    }

    #[tokio::test]
    async fn test_initialize_failure_clears_session_and_fails_order() {
        let harness = Harness::new(Script {
            initialize_fails: true,
            ..success()
        });
        let mut checkout = harness.checkout();

        let err = checkout
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Gateway {
                phase: GatewayPhase::Initialize,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(harness.session.get(PENDING_ORDER_KEY).unwrap(), None);
        let order = harness.store.get(&OrderId::new("o1")).await.unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
        assert!(
            !harness
                .journal
                .events()
                .iter()
                .any(|e| e.starts_with("navigate"))
        );
    }

    #[tokio::test]
    async fn test_return_without_reference_stays_idle() {
        let harness = Harness::new(success());
        let mut checkout = harness.checkout();
        let mut cart = harness.filled_cart();

        let url = Url::parse("https://shop.test/checkout-success").unwrap();
        let outcome = checkout.resume_from_url(&mut cart, &url).await.unwrap();

        assert_eq!(outcome, None);
        assert_eq!(checkout.state(), &CheckoutState::Idle);
        assert!(harness.journal.events().is_empty());
    }

    #[tokio::test]
    async fn test_verified_return_completes_order_then_clears_cart() {
        let harness = Harness::new(success());
        harness
            .checkout()
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap();

        // Second page load.
        let mut checkout = harness.checkout();
        let mut cart = harness.cart();
        let url = Url::parse("https://shop.test/checkout-success?reference=ref_123").unwrap();
        let completed = checkout
            .resume_from_url(&mut cart, &url)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(completed.order_id.as_str(), "o1");
        let events = harness.journal.events();
        let tail: Vec<&str> = events.iter().skip(3).map(String::as_str).collect();
        assert_eq!(
            tail,
            [
                "verify ref_123",
                "update o1 Completed cart_empty=false",
                "notify Success Payment successful, thank you for your order!",
                "navigate /checkout-success",
            ]
        );
        assert_eq!(
            events.iter().filter(|e| e.starts_with("update")).count(),
            1
        );

        let order = harness.store.get(&OrderId::new("o1")).await.unwrap();
        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(
            order.payment_reference,
            Some(TransactionReference::new("ref_123"))
        );
        assert!(cart.is_empty());
        assert!(harness.cart().is_empty());
        assert_eq!(harness.session.get(PENDING_ORDER_KEY).unwrap(), None);
        assert!(matches!(checkout.state(), CheckoutState::Done { .. }));
    }

    #[tokio::test]
    async fn test_declined_payment_never_updates_order() {
        let harness = Harness::new(Script {
            verify: Some(VerificationStatus::Failed),
            ..Script::default()
        });
        harness
            .checkout()
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap();

        let mut checkout = harness.checkout();
        let mut cart = harness.cart();
        let err = checkout
            .resume(&mut cart, Some("ref_123"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Verification(_)));
        assert!(!err.is_retryable());
        let events = harness.journal.events();
        assert!(!events.iter().any(|e| e.starts_with("update")));
        assert!(
            events
                .iter()
                .any(|e| e == "notify Error Your payment was not successful.")
        );

        let order = harness.store.get(&OrderId::new("o1")).await.unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert!(!cart.is_empty());
        assert!(matches!(checkout.state(), CheckoutState::Failed { .. }));
    }

    #[tokio::test]
    async fn test_verification_outage_is_not_retryable() {
        let harness = Harness::new(Script::default());
        let mut checkout = harness.checkout();
        let mut cart = harness.filled_cart();

        let err = checkout
            .resume(&mut cart, Some("ref_123"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Gateway {
                phase: GatewayPhase::Verify,
                ..
            }
        ));
        assert!(!err.is_retryable());
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_return_without_pending_order_fails() {
        let harness = Harness::new(success());
        let mut checkout = harness.checkout();
        let mut cart = harness.filled_cart();

        let err = checkout
            .resume(&mut cart, Some("ref_123"))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::MissingPendingOrder { .. }));
        assert!(
            !harness
                .journal
                .events()
                .iter()
                .any(|e| e.starts_with("update"))
        );
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_keeps_cart_and_reports_gap() {
        let harness = Harness::new(Script {
            fail_update: true,
            ..success()
        });
        harness
            .checkout()
            .begin(&harness.filled_cart(), request("a@b.com"))
            .await
            .unwrap();

        let mut checkout = harness.checkout();
        let mut cart = harness.cart();
        let err = checkout
            .resume(&mut cart, Some("ref_123"))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            CheckoutError::Reconciliation { order_id, reference, .. }
                if order_id.as_str() == "o1" && reference.as_str() == "ref_123"
        ));
        assert!(!cart.is_empty());
        assert_eq!(
            harness.session.get(PENDING_ORDER_KEY).unwrap().as_deref(),
            Some("o1")
        );
        assert!(matches!(checkout.state(), CheckoutState::Failed { .. }));
    }
}
