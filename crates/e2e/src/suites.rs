//! Suites exercising the ledger through the runner

use std::sync::Arc;

use regex::Regex;
use soltap_core::action::case_fn;
use soltap_core::assert::{self, throws, Check};
use soltap_core::chain;
use soltap_core::{Bindings, Builder, Failure, Frame};

use crate::error::LedgerError;
use crate::ledger::{Accounts, Grant, Ledger, Token, ACCOUNTS_KEY, LEDGER_KEY, TOKEN_KEY};

#[track_caller]
fn accounts(frame: &Frame) -> Result<Arc<Accounts>, Failure> {
    frame.require::<Accounts>(ACCOUNTS_KEY)
}

#[track_caller]
fn token(frame: &Frame) -> Result<Arc<Token>, Failure> {
    frame.require::<Token>(TOKEN_KEY)
}

async fn deploy(frame: Frame) -> Result<Bindings, Failure> {
    let ledger = frame.require::<Arc<Ledger>>(LEDGER_KEY)?;
    let accounts = accounts(&frame)?;
    let token = ledger.deploy(&accounts.main).await?;
    Ok(Bindings::new().with(TOKEN_KEY, token))
}

/// Minting and release of the token
pub fn token_suite(t: &mut Builder<'_>) -> Result<(), Failure> {
    t.describe("Token", |t| {
        t.before(chain::snapshot);
        t.after(chain::rollback);
        t.define(deploy);

        t.describe("#mint()", |t| {
            t.before(chain::snapshot);
            t.after(chain::rollback);

            t.it("Should increase balanceOf", |frame| async move {
                let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                token.mint(&accounts.main, &accounts.member1, 10).await?;
                assert::equal(token.balance_of(&accounts.member1).await?, 10u64)
            });

            t.it("Should increase total supply", |frame| async move {
                let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                token.mint(&accounts.main, &accounts.member1, 10).await?;
                assert::equal(token.total_supply().await?, 20u64)
            });

            t.it("Should reject minting by non-owner", |frame| async move {
                let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                let caught = throws("VM Exception while processing transaction: revert owner_only", async {
                    Ok::<_, Failure>(token.mint(&accounts.member1, &accounts.member1, 1).await?)
                })
                .await?;
                assert::ok(caught)
            });
            Ok(())
        })?;

        t.describe("#release()", |t| {
            t.before(chain::snapshot);
            t.after(chain::rollback);

            t.it("Should change #isReleased() value", |frame| async move {
                let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                assert::equal(token.is_released().await?, false)?;
                token.release(&accounts.main).await?;
                assert::equal(token.is_released().await?, true)
            });

            t.it("Should deprecate minting", |frame| async move {
                let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                assert::equal(token.is_released().await?, true)?;

                let pattern = Regex::new("not_released_only")?;
                let caught = throws(pattern, async {
                    Ok::<_, Failure>(token.mint(&accounts.main, &accounts.member1, 1).await?)
                })
                .await?;
                assert::ok(caught)
            });
            Ok(())
        })?;

        t.it("Should start with empty supply after rollback", |frame| async move {
            assert::equal(token(&frame)?.total_supply().await?, 0u64)
        });
        Ok(())
    })
}

/// Time-locked grants
pub fn vesting_suite(t: &mut Builder<'_>) -> Result<(), Failure> {
    t.describe("Vesting", |t| {
        t.before(chain::snapshot);
        t.after(chain::rollback);
        t.define(deploy);
        t.define(|_| async { Ok(Bindings::new().with("cliff", 3600u64)) });

        t.describe("#claim()", |t| {
            t.it(
                "Should keep tokens locked before the cliff",
                chain::wrap(|frame| async move {
                    let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                    let cliff = frame.require::<u64>("cliff")?;
                    token.grant(&accounts.main, &accounts.member1, 100, *cliff).await?;

                    let caught = throws(
                        Check::predicate(|failure| failure.message().ends_with("cliff_not_reached")),
                        async { Ok::<_, Failure>(token.claim(&accounts.member1).await?) },
                    )
                    .await?;
                    assert::ok(caught)?;
                    assert::equal(token.balance_of(&accounts.member1).await?, 0u64)
                }),
            );

            t.it(
                "Should release tokens after the cliff",
                chain::wrap(|frame| async move {
                    let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                    let cliff = frame.require::<u64>("cliff")?;
                    token.grant(&accounts.main, &accounts.member1, 100, *cliff).await?;

                    chain::evm(&frame)?.increase_time(*cliff).await?;
                    assert::equal(token.claim(&accounts.member1).await?, 100u64)
                }),
            );

            t.it_steps(
                "Should reject a second grant and a missing claim",
                vec![
                    case_fn(|frame| async move {
                        let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                        token.grant(&accounts.main, &accounts.member2, 5, 10).await?;
                        let second = token.grant(&accounts.main, &accounts.member2, 5, 10).await;
                        assert::equal(second, Err::<Grant, _>(LedgerError::revert("grant_exists")))
                    }),
                    case_fn(|frame| async move {
                        let (token, accounts) = (token(&frame)?, accounts(&frame)?);
                        let claim = token.claim(&accounts.main).await;
                        assert::equal(claim, Err::<u64, _>(LedgerError::revert("no_grant")))
                    }),
                ],
            );
            Ok(())
        })?;

        t.it("Should not leak grants between cases", |frame| async move {
            let (token, accounts) = (token(&frame)?, accounts(&frame)?);
            assert::equal(token.balance_of(&accounts.member1).await?, 0u64)?;
            assert::equal(token.total_supply().await?, 5u64)
        });
        Ok(())
    })
}

/// Reads the forwarded command-line arguments
pub fn argv_suite(t: &mut Builder<'_>) -> Result<(), Failure> {
    t.describe("Harness", |t| {
        t.it("Should expose argv to suites", |frame| async move {
            let argv = frame.get::<Vec<String>>(soltap_core::ARGV_KEY);
            assert::ok(argv.is_some())
        });
        Ok(())
    })
}
