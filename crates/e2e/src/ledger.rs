//! In-memory development chain with a single mintable token
//!
//! Stands in for a node process: state lives behind a mutex, snapshots are
//! full copies, and the clock only moves when asked to.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use soltap_core::chain::{self, Evm};
use soltap_core::{Bindings, Failure};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Frame key of the shared [`Ledger`]
pub const LEDGER_KEY: &str = "ledger";

/// Frame key of the test [`Accounts`]
pub const ACCOUNTS_KEY: &str = "accounts";

/// Frame key of a deployed [`Token`]
pub const TOKEN_KEY: &str = "token";

/// Well-known test addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accounts {
    pub main: String,
    pub member1: String,
    pub member2: String,
}

impl Default for Accounts {
    fn default() -> Self {
        Self {
            main: "0x00000000000000000000000000000000000000a1".to_string(),
            member1: "0x00000000000000000000000000000000000000b1".to_string(),
            member2: "0x00000000000000000000000000000000000000b2".to_string(),
        }
    }
}

/// Tokens locked for a beneficiary until `unlock_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub amount: u64,
    pub unlock_at: u64,
}

#[derive(Debug, Clone, Default)]
struct TokenState {
    owner: String,
    balances: HashMap<String, u64>,
    total_supply: u64,
    released: bool,
    grants: HashMap<String, Grant>,
}

#[derive(Debug, Clone, Default)]
struct ChainState {
    clock: u64,
    token: Option<TokenState>,
}

/// The chain
#[derive(Debug, Default)]
pub struct Ledger {
    state: Mutex<ChainState>,
    snapshots: Mutex<Vec<ChainState>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a fresh token owned by `owner`, replacing any previous one
    pub async fn deploy(self: &Arc<Self>, owner: &str) -> LedgerResult<Token> {
        debug!(owner, "Deploying token");
        self.state.lock().token = Some(TokenState {
            owner: owner.to_string(),
            ..TokenState::default()
        });
        Ok(Token {
            ledger: Arc::clone(self),
        })
    }

    /// Current chain time in seconds
    pub fn now(&self) -> u64 {
        self.state.lock().clock
    }

    /// Number of snapshots waiting to be reverted
    pub fn pending_snapshots(&self) -> usize {
        self.snapshots.lock().len()
    }

    fn with_token<T>(&self, apply: impl FnOnce(&mut TokenState, u64) -> LedgerResult<T>) -> LedgerResult<T> {
        let mut state = self.state.lock();
        let clock = state.clock;
        let token = state.token.as_mut().ok_or(LedgerError::NotDeployed)?;
        apply(token, clock)
    }
}

#[async_trait]
impl Evm for Ledger {
    async fn snapshot(&self) -> Result<(), Failure> {
        let state = self.state.lock().clone();
        self.snapshots.lock().push(state);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), Failure> {
        let state = self.snapshots.lock().pop().ok_or(LedgerError::NoSnapshot)?;
        *self.state.lock() = state;
        Ok(())
    }

    async fn increase_time(&self, seconds: u64) -> Result<(), Failure> {
        self.state.lock().clock += seconds;
        Ok(())
    }
}

/// Root-frame bindings for suites running against `ledger`
pub fn context(ledger: Arc<Ledger>) -> Bindings {
    chain::bind(Bindings::new(), ledger.clone())
        .with(LEDGER_KEY, ledger)
        .with(ACCOUNTS_KEY, Accounts::default())
}

/// Handle to the deployed token
#[derive(Debug, Clone)]
pub struct Token {
    ledger: Arc<Ledger>,
}

impl Token {
    pub async fn mint(&self, from: &str, to: &str, amount: u64) -> LedgerResult<()> {
        self.ledger.with_token(|token, _| {
            if token.owner != from {
                return Err(LedgerError::revert("owner_only"));
            }
            if token.released {
                return Err(LedgerError::revert("not_released_only"));
            }
            *token.balances.entry(to.to_string()).or_default() += amount;
            token.total_supply += amount;
            Ok(())
        })
    }

    pub async fn transfer(&self, from: &str, to: &str, amount: u64) -> LedgerResult<()> {
        self.ledger.with_token(|token, _| {
            if !token.released {
                return Err(LedgerError::revert("released_only"));
            }
            let balance = token.balances.entry(from.to_string()).or_default();
            if *balance < amount {
                return Err(LedgerError::revert("insufficient_balance"));
            }
            *balance -= amount;
            *token.balances.entry(to.to_string()).or_default() += amount;
            Ok(())
        })
    }

    /// Stop minting and allow transfers
    pub async fn release(&self, from: &str) -> LedgerResult<()> {
        self.ledger.with_token(|token, _| {
            if token.owner != from {
                return Err(LedgerError::revert("owner_only"));
            }
            token.released = true;
            Ok(())
        })
    }

    /// Lock `amount` new tokens for `beneficiary` for `duration` seconds
    pub async fn grant(&self, from: &str, beneficiary: &str, amount: u64, duration: u64) -> LedgerResult<Grant> {
        self.ledger.with_token(|token, now| {
            if token.owner != from {
                return Err(LedgerError::revert("owner_only"));
            }
            if token.grants.contains_key(beneficiary) {
                return Err(LedgerError::revert("grant_exists"));
            }
            let grant = Grant {
                amount,
                unlock_at: now + duration,
            };
            token.grants.insert(beneficiary.to_string(), grant);
            token.total_supply += amount;
            Ok(grant)
        })
    }

    /// Move an unlocked grant into the beneficiary's balance
    pub async fn claim(&self, beneficiary: &str) -> LedgerResult<u64> {
        self.ledger.with_token(|token, now| {
            let grant = *token
                .grants
                .get(beneficiary)
                .ok_or_else(|| LedgerError::revert("no_grant"))?;
            if now < grant.unlock_at {
                return Err(LedgerError::revert("cliff_not_reached"));
            }
            token.grants.remove(beneficiary);
            *token.balances.entry(beneficiary.to_string()).or_default() += grant.amount;
            Ok(grant.amount)
        })
    }

    pub async fn balance_of(&self, account: &str) -> LedgerResult<u64> {
        self.ledger
            .with_token(|token, _| Ok(token.balances.get(account).copied().unwrap_or_default()))
    }

    pub async fn total_supply(&self) -> LedgerResult<u64> {
        self.ledger.with_token(|token, _| Ok(token.total_supply))
    }

    pub async fn is_released(&self) -> LedgerResult<bool> {
        self.ledger.with_token(|token, _| Ok(token.released))
    }
}
