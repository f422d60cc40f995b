//! Ports: trait boundaries between the reconciliation core and the outside
//! world. Every external collaborator (store, group management, messaging,
//! billing) is reached through one of these, which is what makes the engine
//! testable with in-memory fakes.

mod access_controller;
mod billing_client;
mod checkout;
mod notifier;
mod subscription_store;

pub use access_controller::{AccessController, AccessError, AccessToken};
pub use billing_client::{BillingClient, BillingError, BillingSubscription};
pub use checkout::{CheckoutProvider, CheckoutRedirect, CheckoutRequest};
pub use notifier::{NotificationContext, NotificationKind, Notifier, NotifyError};
pub use subscription_store::{Mutation, RecordMutator, StoreError, SubscriptionStore};
