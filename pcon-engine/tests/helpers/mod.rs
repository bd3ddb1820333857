//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use pcon_engine::{ConstructorController, EngineConfig, StepId};
use serde_json::{json, Value};

pub const COMPANY: StepId = StepId(1);
pub const SPECIFICATION: StepId = StepId(2);
pub const METHOD: StepId = StepId(4);
pub const REQUISITES: StepId = StepId(5);

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pcon_engine=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Reference 7-step wizard with default configuration
pub fn controller() -> ConstructorController {
    init_tracing();
    ConstructorController::standard(&EngineConfig::default()).expect("standard wiring")
}

pub fn bank_account() -> Value {
    json!({"kind": "bank_account", "bank_name": "Alfa", "account_number": "40702810900000000001"})
}

pub fn p2p_card() -> Value {
    json!({"kind": "p2p_card", "card_number": "4111111111111111", "card_holder": "I IVANOV"})
}

pub fn crypto_wallet() -> Value {
    json!({"kind": "crypto_wallet", "currency": "USDT", "wallet_address": "TXyz", "network": "TRC20"})
}

/// Payload currently stored for `step`
pub fn payload(controller: &ConstructorController, step: StepId) -> Option<Value> {
    controller.get_snapshot().get(step).and_then(|s| s.payload.clone())
}
