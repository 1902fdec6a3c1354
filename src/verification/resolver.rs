use log::info;

use crate::gamedb::GameDatabase;
use crate::settings::GuildSettings;

use super::errors::VerifyError;
use super::models::{
    LinkRewrite, MutationRequests, Resolution, ResolutionResult, ResolveRequest,
};

/// Decides the outcome of one verification attempt.
///
/// Reads go through the database port; every mutation (the link rewrite and
/// the role grants) is surfaced in the returned [`Resolution`] for the
/// caller to execute. A presented token takes precedence over a stored
/// link; a stored link is reused as-is and never rewritten.
pub async fn resolve(
    db: &dyn GameDatabase,
    request: &ResolveRequest,
    settings: &GuildSettings,
) -> Result<Resolution, VerifyError> {
    let base_role = settings
        .verified_role
        .ok_or(VerifyError::MissingConfiguration("verified"))?;
    let qualified_role = settings
        .verified_living_role
        .ok_or(VerifyError::MissingConfiguration("verified living"))?;

    if request.has_base_role && request.has_qualified_role {
        return Ok(Resolution::outcome_only(ResolutionResult::AlreadyVerified));
    }

    let mut token_match = None;
    if let Some(token) = request.token.as_deref() {
        if let Some(ckey) = db.lookup_ckey_by_token(token).await? {
            token_match = Some((token.to_string(), ckey));
        }
    }

    // No token, or the token didn't resolve: fall back to a still-valid
    // link for this account. That path reuses the stored ckey and skips
    // the rewrite entirely.
    let (ckey, rewrite) = match token_match {
        Some((token, ckey)) => {
            let rewrite = LinkRewrite {
                token,
                ckey: ckey.clone(),
                account_id: request.account_id,
            };
            (ckey, Some(rewrite))
        }
        None => match db.find_valid_link_by_account(request.account_id).await? {
            Some(link) => (link.ckey, None),
            None => return Ok(Resolution::outcome_only(ResolutionResult::NoLinkFound)),
        },
    };

    info!(
        "verification request from {} for ckey {}, token supplied: {}",
        request.account_id,
        ckey,
        request.token.is_some()
    );

    let player = match db.get_player_by_ckey(&ckey).await? {
        Some(player) => player,
        None => {
            return Ok(Resolution::outcome_only(ResolutionResult::PlayerNotFound {
                ckey,
            }))
        }
    };

    let mut requests = MutationRequests {
        rewrite,
        grant_base: Some(base_role),
        grant_qualified: None,
    };

    let result = if player.living_minutes >= settings.min_living_minutes {
        requests.grant_qualified = Some(qualified_role);
        ResolutionResult::LinkedAndQualified {
            ckey,
            living_minutes: player.living_minutes,
        }
    } else {
        ResolutionResult::LinkedButUnqualified {
            ckey,
            living_minutes: player.living_minutes,
            required_minutes: settings.min_living_minutes,
        }
    };

    Ok(Resolution { result, requests })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamedb::{Ckey, DbError, DiscordLink, Player};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory stand-in for the game database. Reads are counted and any
    /// mutation call is recorded, so tests can assert the resolver itself
    /// never mutates anything.
    #[derive(Default)]
    struct FakeDb {
        tokens: HashMap<String, Ckey>,
        valid_links: HashMap<u64, Ckey>,
        players: HashMap<Ckey, i64>,
        reads: AtomicUsize,
        mutations: Mutex<Vec<String>>,
    }

    impl FakeDb {
        fn with_token(mut self, token: &str, ckey: &str) -> Self {
            self.tokens.insert(token.to_string(), Ckey::normalise(ckey));
            self
        }

        fn with_link(mut self, account_id: u64, ckey: &str) -> Self {
            self.valid_links.insert(account_id, Ckey::normalise(ckey));
            self
        }

        fn with_player(mut self, ckey: &str, living_minutes: i64) -> Self {
            self.players.insert(Ckey::normalise(ckey), living_minutes);
            self
        }

        fn mutation_count(&self) -> usize {
            self.mutations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GameDatabase for FakeDb {
        async fn lookup_ckey_by_token(&self, token: &str) -> Result<Option<Ckey>, DbError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.tokens.get(token).cloned())
        }

        async fn find_valid_link_by_account(
            &self,
            account_id: u64,
        ) -> Result<Option<DiscordLink>, DbError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.valid_links.get(&account_id).map(|ckey| DiscordLink {
                ckey: ckey.clone(),
                discord_id: Some(account_id),
                timestamp: Utc::now(),
                valid: true,
            }))
        }

        async fn links_for_ckey(&self, _ckey: &Ckey) -> Result<Vec<DiscordLink>, DbError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn invalidate_links_for_ckey(&self, ckey: &Ckey) -> Result<(), DbError> {
            self.mutations
                .lock()
                .unwrap()
                .push(format!("invalidate ckey {ckey}"));
            Ok(())
        }

        async fn invalidate_links_for_account(&self, account_id: u64) -> Result<(), DbError> {
            self.mutations
                .lock()
                .unwrap()
                .push(format!("invalidate account {account_id}"));
            Ok(())
        }

        async fn create_link(&self, token: &str, account_id: u64) -> Result<(), DbError> {
            self.mutations
                .lock()
                .unwrap()
                .push(format!("create {token} for {account_id}"));
            Ok(())
        }

        async fn get_player_by_ckey(&self, ckey: &Ckey) -> Result<Option<Player>, DbError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.players.get(ckey).map(|&living_minutes| Player {
                ckey: ckey.clone(),
                living_minutes,
                first_seen: None,
                last_seen: None,
            }))
        }
    }

    fn settings() -> GuildSettings {
        GuildSettings {
            verified_role: Some(10),
            verified_living_role: Some(20),
            min_living_minutes: 60,
            ..GuildSettings::default()
        }
    }

    fn request(token: Option<&str>) -> ResolveRequest {
        ResolveRequest {
            account_id: 1000,
            token: token.map(str::to_owned),
            has_base_role: false,
            has_qualified_role: false,
        }
    }

    #[tokio::test]
    async fn both_roles_held_short_circuits() {
        let db = FakeDb::default();
        let req = ResolveRequest {
            has_base_role: true,
            has_qualified_role: true,
            ..request(Some("token"))
        };
        let resolution = resolve(&db, &req, &settings()).await.unwrap();
        assert_eq!(resolution.result, ResolutionResult::AlreadyVerified);
        assert!(resolution.requests.is_empty());
        assert_eq!(db.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_role_held_is_not_already_verified() {
        let db = FakeDb::default()
            .with_token("tok", "oranges")
            .with_player("oranges", 90);
        let req = ResolveRequest {
            has_base_role: true,
            ..request(Some("tok"))
        };
        let resolution = resolve(&db, &req, &settings()).await.unwrap();
        assert!(matches!(
            resolution.result,
            ResolutionResult::LinkedAndQualified { .. }
        ));
    }

    #[tokio::test]
    async fn missing_role_config_fails_before_any_lookup() {
        let db = FakeDb::default().with_token("tok", "oranges");
        let incomplete = GuildSettings {
            verified_role: Some(10),
            verified_living_role: None,
            ..GuildSettings::default()
        };
        let err = resolve(&db, &request(Some("tok")), &incomplete)
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::MissingConfiguration(_)));
        assert_eq!(db.reads.load(Ordering::SeqCst), 0);
        assert_eq!(db.mutation_count(), 0);
    }

    #[tokio::test]
    async fn token_resolution_qualifies_and_requests_rewrite_and_both_grants() {
        let db = FakeDb::default()
            .with_token("tok", "oranges")
            .with_player("oranges", 61);
        let resolution = resolve(&db, &request(Some("tok")), &settings())
            .await
            .unwrap();

        assert_eq!(
            resolution.result,
            ResolutionResult::LinkedAndQualified {
                ckey: Ckey::normalise("oranges"),
                living_minutes: 61,
            }
        );
        assert_eq!(
            resolution.requests.rewrite,
            Some(LinkRewrite {
                token: "tok".to_string(),
                ckey: Ckey::normalise("oranges"),
                account_id: 1000,
            })
        );
        assert_eq!(resolution.requests.grant_base, Some(10));
        assert_eq!(resolution.requests.grant_qualified, Some(20));
        // The resolver surfaces requests; it must not have executed any.
        assert_eq!(db.mutation_count(), 0);
    }

    #[tokio::test]
    async fn below_threshold_withholds_the_qualified_role_only() {
        let db = FakeDb::default()
            .with_token("tok", "newbie")
            .with_player("newbie", 59);
        let resolution = resolve(&db, &request(Some("tok")), &settings())
            .await
            .unwrap();

        assert_eq!(
            resolution.result,
            ResolutionResult::LinkedButUnqualified {
                ckey: Ckey::normalise("newbie"),
                living_minutes: 59,
                required_minutes: 60,
            }
        );
        assert!(resolution.requests.rewrite.is_some());
        assert_eq!(resolution.requests.grant_base, Some(10));
        assert_eq!(resolution.requests.grant_qualified, None);
    }

    #[tokio::test]
    async fn exactly_at_threshold_qualifies() {
        let db = FakeDb::default()
            .with_token("tok", "edge")
            .with_player("edge", 60);
        let resolution = resolve(&db, &request(Some("tok")), &settings())
            .await
            .unwrap();
        assert!(matches!(
            resolution.result,
            ResolutionResult::LinkedAndQualified { .. }
        ));
    }

    #[tokio::test]
    async fn preexisting_link_is_reused_without_a_rewrite() {
        let db = FakeDb::default()
            .with_link(1000, "veteran")
            .with_player("veteran", 400);
        let resolution = resolve(&db, &request(None), &settings()).await.unwrap();

        assert!(matches!(
            resolution.result,
            ResolutionResult::LinkedAndQualified { .. }
        ));
        assert_eq!(resolution.requests.rewrite, None);
        assert_eq!(resolution.requests.grant_base, Some(10));
        assert_eq!(resolution.requests.grant_qualified, Some(20));
    }

    #[tokio::test]
    async fn unmatched_token_falls_back_to_the_stored_link() {
        let db = FakeDb::default()
            .with_link(1000, "veteran")
            .with_player("veteran", 400);
        let resolution = resolve(&db, &request(Some("stale-token")), &settings())
            .await
            .unwrap();
        // The stale token is ignored; the stored link is reused as-is.
        assert_eq!(resolution.requests.rewrite, None);
        assert!(matches!(
            resolution.result,
            ResolutionResult::LinkedAndQualified { .. }
        ));
    }

    #[tokio::test]
    async fn matching_token_wins_over_the_stored_link() {
        let db = FakeDb::default()
            .with_token("tok", "fresh")
            .with_link(1000, "stale")
            .with_player("fresh", 100)
            .with_player("stale", 100);
        let resolution = resolve(&db, &request(Some("tok")), &settings())
            .await
            .unwrap();

        let rewrite = resolution.requests.rewrite.unwrap();
        assert_eq!(rewrite.ckey, Ckey::normalise("fresh"));
        assert!(matches!(
            resolution.result,
            ResolutionResult::LinkedAndQualified { ref ckey, .. } if *ckey == Ckey::normalise("fresh")
        ));
    }

    #[tokio::test]
    async fn no_token_and_no_link_is_recoverable() {
        let db = FakeDb::default();
        let resolution = resolve(&db, &request(None), &settings()).await.unwrap();
        assert_eq!(resolution.result, ResolutionResult::NoLinkFound);
        assert!(resolution.requests.is_empty());
        assert_eq!(db.mutation_count(), 0);
    }

    #[tokio::test]
    async fn missing_player_record_requests_nothing() {
        let db = FakeDb::default().with_token("tok", "ghost");
        let resolution = resolve(&db, &request(Some("tok")), &settings())
            .await
            .unwrap();
        assert_eq!(
            resolution.result,
            ResolutionResult::PlayerNotFound {
                ckey: Ckey::normalise("ghost"),
            }
        );
        assert!(resolution.requests.is_empty());
        assert_eq!(db.mutation_count(), 0);
    }
}
