//! Checkout flow service.
//!
//! Orchestrates the SHIPPING → PAYMENT → REVIEW flow against the
//! repositories. Expired sessions are caught lazily here, on every load, and
//! deleted on sight; there is no background sweeper.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use colibri_core::{AddressId, Money, PaymentMethodId, ProductId, UserId};

use crate::checkout::error::CheckoutError;
use crate::checkout::{
    calculate_shipping_options, can_proceed_to_next_step, compute_summary, generate_order_number,
    is_card_expired, session_expiry, validate_address, validate_checkout_session,
};
use crate::db::orders::NewOrder;
use crate::db::{
    AddressRepository, CartRepository, CheckoutSessionRepository, OrderRepository,
    PaymentMethodRepository, ProductRepository, RepositoryError,
};
use crate::models::cart::Cart;
use crate::models::checkout::CheckoutSession;
use crate::models::order::{FiscalInvoice, Order, OrderItem, PaymentSnapshot};
use crate::models::shipping::{ShippingOption, ShippingSelection, ShippingTier};
use crate::services::stripe::{StripeClient, StripeError};

/// Errors surfaced by the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutServiceError {
    /// A checkout rule rejected the request.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Payment gateway failure.
    #[error(transparent)]
    Stripe(#[from] StripeError),
}

/// A freshly placed order plus what the frontend needs to take payment.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    /// The persisted order, in `PENDING_PAYMENT`.
    pub order: Order,
    /// Stripe client secret for confirming the payment, when the intent was
    /// created successfully.
    pub client_secret: Option<String>,
}

/// Checkout flow service.
pub struct CheckoutService<'a> {
    sessions: CheckoutSessionRepository<'a>,
    carts: CartRepository<'a>,
    addresses: AddressRepository<'a>,
    payment_methods: PaymentMethodRepository<'a>,
    products: ProductRepository<'a>,
    orders: OrderRepository<'a>,
    stripe: &'a StripeClient,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, stripe: &'a StripeClient) -> Self {
        Self {
            sessions: CheckoutSessionRepository::new(pool),
            carts: CartRepository::new(pool),
            addresses: AddressRepository::new(pool),
            payment_methods: PaymentMethodRepository::new(pool),
            products: ProductRepository::new(pool),
            orders: OrderRepository::new(pool),
            stripe,
        }
    }

    /// Start a checkout session from the user's cart, replacing any previous
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `EMPTY_CART` if the cart is missing or empty, and
    /// `INSUFFICIENT_STOCK` if any line exceeds available stock.
    pub async fn start_checkout(
        &self,
        user_id: UserId,
    ) -> Result<CheckoutSession, CheckoutServiceError> {
        let cart = self
            .carts
            .get_for_user(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or(CheckoutError::EmptyCart)?;

        self.check_stock(&cart).await?;

        let subtotal = cart.subtotal();
        let summary = compute_summary(subtotal, Money::zero(), Money::zero());

        let now = Utc::now();
        let item_count = u32::try_from(cart.items.len()).unwrap_or(u32::MAX);
        let session = self
            .sessions
            .create(user_id, cart.id, item_count, &summary, now, session_expiry(now))
            .await?;

        info!(user_id = user_id.as_i32(), session_id = session.id.as_i32(), "checkout started");
        Ok(session)
    }

    /// Get the user's active session, expiring it lazily.
    ///
    /// # Errors
    ///
    /// Returns `SESSION_EXPIRED` (and deletes the session) when the expiry
    /// has passed, `RepositoryError::NotFound` when there is none.
    pub async fn get_session(
        &self,
        user_id: UserId,
    ) -> Result<CheckoutSession, CheckoutServiceError> {
        let session = self
            .sessions
            .get_for_user(user_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if session.is_expired(Utc::now()) {
            self.sessions.delete_for_user(user_id).await?;
            return Err(CheckoutError::SessionExpired.into());
        }

        Ok(session)
    }

    /// Compute shipping options for one of the user's addresses against the
    /// current session subtotal.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ADDRESS` when the address fails validation and
    /// `SHIPPING_NOT_AVAILABLE` when no option can be offered.
    pub async fn shipping_options(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Vec<ShippingOption>, CheckoutServiceError> {
        let session = self.get_session(user_id).await?;
        let address = self
            .addresses
            .get(user_id, address_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let field_errors = validate_address(&address);
        if !field_errors.is_empty() {
            return Err(CheckoutError::InvalidAddress(field_errors).into());
        }

        let options = calculate_shipping_options(
            address.state,
            &address.postal_code,
            session.summary.subtotal,
            Utc::now(),
        );

        if options.is_empty() {
            return Err(CheckoutError::ShippingNotAvailable.into());
        }

        Ok(options)
    }

    /// Select a shipping address. Any previously selected shipping option is
    /// cleared, since it was priced for the old address.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ADDRESS` when the address fails validation.
    pub async fn select_address(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<CheckoutSession, CheckoutServiceError> {
        let mut session = self.get_session(user_id).await?;
        let address = self
            .addresses
            .get(user_id, address_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let field_errors = validate_address(&address);
        if !field_errors.is_empty() {
            return Err(CheckoutError::InvalidAddress(field_errors).into());
        }

        session.address_id = Some(address_id);
        session.shipping = None;
        session.summary = compute_summary(
            session.summary.subtotal,
            session.summary.discount,
            Money::zero(),
        );
        self.sessions.update(&session).await?;

        Ok(session)
    }

    /// Select a shipping tier, re-pricing it for the selected address.
    ///
    /// # Errors
    ///
    /// Returns `SHIPPING_NOT_AVAILABLE` when the tier is not offered for the
    /// address, `INVALID_SHIPPING` when no address is selected yet.
    pub async fn select_shipping(
        &self,
        user_id: UserId,
        tier: ShippingTier,
    ) -> Result<CheckoutSession, CheckoutServiceError> {
        let mut session = self.get_session(user_id).await?;
        let address_id = session.address_id.ok_or(CheckoutError::InvalidShipping)?;
        let address = self
            .addresses
            .get(user_id, address_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let options = calculate_shipping_options(
            address.state,
            &address.postal_code,
            session.summary.subtotal,
            Utc::now(),
        );
        let option = options
            .iter()
            .find(|option| option.tier == tier)
            .ok_or(CheckoutError::ShippingNotAvailable)?;

        session.shipping = Some(ShippingSelection::from(option));
        session.summary = compute_summary(
            session.summary.subtotal,
            session.summary.discount,
            option.cost,
        );
        self.sessions.update(&session).await?;

        Ok(session)
    }

    /// Select a saved payment method.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_PAYMENT` for malformed methods and expired cards.
    pub async fn select_payment(
        &self,
        user_id: UserId,
        payment_method_id: PaymentMethodId,
    ) -> Result<CheckoutSession, CheckoutServiceError> {
        let mut session = self.get_session(user_id).await?;
        let method = self
            .payment_methods
            .get(user_id, payment_method_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        if !method.is_well_formed() {
            return Err(CheckoutError::InvalidPayment.into());
        }
        if let (Some(month), Some(year)) = (method.exp_month, method.exp_year)
            && is_card_expired(month, year, Utc::now().date_naive())
        {
            return Err(CheckoutError::InvalidPayment.into());
        }

        session.payment_method_id = Some(payment_method_id);
        self.sessions.update(&session).await?;

        Ok(session)
    }

    /// Advance to the next step, if the current step's gate passes.
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION` errors describing what is missing when the gate
    /// fails.
    pub async fn advance_step(
        &self,
        user_id: UserId,
    ) -> Result<CheckoutSession, CheckoutServiceError> {
        let mut session = self.get_session(user_id).await?;

        if !can_proceed_to_next_step(session.step, &session) {
            let validation = validate_checkout_session(&session);
            return Err(CheckoutError::Validation(validation.errors).into());
        }

        if let Some(next) = session.step.next() {
            session.step = next;
            self.sessions.update(&session).await?;
        }

        Ok(session)
    }

    /// Place the order: re-validate everything, re-check prices and stock,
    /// snapshot the session into an immutable order, create the payment
    /// intent, then clear the cart and session.
    ///
    /// # Errors
    ///
    /// Returns the blocking [`CheckoutError`] when any re-check fails. A
    /// gateway failure after the insert is logged, not fatal: the order
    /// stays in `PENDING_PAYMENT` with no client secret.
    pub async fn create_order(
        &self,
        user_id: UserId,
        invoice: Option<FiscalInvoice>,
    ) -> Result<PlacedOrder, CheckoutServiceError> {
        let session = self.get_session(user_id).await?;

        let validation = validate_checkout_session(&session);
        if !validation.can_place_order {
            return Err(CheckoutError::Validation(validation.errors).into());
        }

        let cart = self.carts.get(session.cart_id).await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart.into());
        }

        // address_id / payment_method_id are Some per the validation above.
        let address_id = session.address_id.ok_or(CheckoutError::InvalidAddress(vec![]))?;
        let payment_method_id = session
            .payment_method_id
            .ok_or(CheckoutError::InvalidPayment)?;
        let shipping = session
            .shipping
            .clone()
            .ok_or(CheckoutError::InvalidShipping)?;

        let address = self
            .addresses
            .get(user_id, address_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let method = self
            .payment_methods
            .get(user_id, payment_method_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        self.check_prices(&cart).await?;
        self.check_stock(&cart).await?;

        // Recompute totals from the cart rather than trusting the stored
        // summary, then reserve stock for the whole cart in one transaction.
        let summary = compute_summary(cart.subtotal(), session.summary.discount, shipping.cost);

        let lines: Vec<(ProductId, u32)> = cart
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        if let Some(product_id) = self.products.reserve_stock(&lines).await? {
            let (name, requested) = cart
                .items
                .iter()
                .find(|item| item.product_id == product_id)
                .map_or_else(|| (String::new(), 0), |item| (item.name.clone(), item.quantity));
            let available = self
                .products
                .get(product_id)
                .await?
                .map_or(0, |product| product.stock.max(0));
            return Err(CheckoutError::InsufficientStock {
                name,
                requested,
                available,
            }
            .into());
        }

        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .map(|item| OrderItem {
                product_id: item.product_id,
                variant_id: item.variant_id,
                name: item.name.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
            })
            .collect();

        let new = NewOrder {
            user_id,
            items,
            shipping_address: serde_json::to_value(&address)
                .map_err(|e| RepositoryError::corrupt("failed to serialize address", e))?,
            shipping: serde_json::to_value(&shipping)
                .map_err(|e| RepositoryError::corrupt("failed to serialize shipping", e))?,
            payment: PaymentSnapshot {
                method_type: method.method_type,
                last4: method.last4.clone(),
                brand: method.brand,
                provider_id: method.provider_id.clone(),
            },
            summary: serde_json::to_value(summary)
                .map_err(|e| RepositoryError::corrupt("failed to serialize summary", e))?,
            invoice,
        };

        // The rng lives inside the closure: thread-local rngs are not Send
        // and must not be held across the insert's await.
        let created = self
            .orders
            .create(&new, || generate_order_number(Utc::now(), &mut rand::rng()))
            .await;
        let mut order = match created {
            Ok(order) => order,
            Err(e) => {
                // The order never existed; put the reservation back.
                if let Err(release) = self.products.release_stock(&lines).await {
                    warn!(error = %release, "failed to release reserved stock");
                }
                return Err(e.into());
            }
        };

        let client_secret = match self
            .stripe
            .create_payment_intent(&summary.total, &order.order_number)
            .await
        {
            Ok(intent) => {
                self.orders.set_payment_intent(order.id, &intent.id).await?;
                order.payment_intent_id = Some(intent.id);
                intent.client_secret
            }
            Err(e) => {
                warn!(order_number = %order.order_number, error = %e, "payment intent creation failed");
                self.orders
                    .append_note(order.id, "payment intent creation failed")
                    .await?;
                None
            }
        };

        self.carts.clear(cart.id).await?;
        self.sessions.delete_for_user(user_id).await?;

        info!(
            user_id = user_id.as_i32(),
            order_number = %order.order_number,
            total = %order.summary.total,
            "order placed"
        );

        Ok(PlacedOrder {
            order,
            client_secret,
        })
    }

    /// Abandon the session explicitly.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn cancel_session(&self, user_id: UserId) -> Result<bool, CheckoutServiceError> {
        Ok(self.sessions.delete_for_user(user_id).await?)
    }

    async fn check_stock(&self, cart: &Cart) -> Result<(), CheckoutServiceError> {
        let ids: Vec<_> = cart.items.iter().map(|item| item.product_id).collect();
        let products = self.products.get_many(&ids).await?;

        for item in &cart.items {
            let product = products.iter().find(|p| p.id == item.product_id);
            let available = product.filter(|p| p.is_active).map_or(0, |p| p.stock);
            let requested = i32::try_from(item.quantity).unwrap_or(i32::MAX);

            if available < requested {
                return Err(CheckoutError::InsufficientStock {
                    name: item.name.clone(),
                    requested: item.quantity,
                    available: available.max(0),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Reject order placement when any cart line's locked-in price no longer
    /// matches the catalog.
    async fn check_prices(&self, cart: &Cart) -> Result<(), CheckoutServiceError> {
        let ids: Vec<_> = cart.items.iter().map(|item| item.product_id).collect();
        let products = self.products.get_many(&ids).await?;

        for item in &cart.items {
            let current = products
                .iter()
                .find(|p| p.id == item.product_id)
                .map(|p| p.price);

            if current != Some(item.unit_price) {
                return Err(CheckoutError::PriceChanged.into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // axum handlers require Send futures. This fails to compile if any
    // non-Send value (a thread-local rng, for one) is held across an await
    // inside the checkout flow.
    #[allow(dead_code)]
    fn assert_checkout_futures_are_send(service: &CheckoutService<'_>, user_id: UserId) {
        fn require_send<T: Send>(_: T) {}
        require_send(service.start_checkout(user_id));
        require_send(service.create_order(user_id, None));
    }
}
