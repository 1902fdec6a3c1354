use crate::gamedb::Ckey;

/// Everything the resolver needs to know about the caller, collected by the
/// command layer before resolution starts.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub account_id: u64,
    pub token: Option<String>,
    pub has_base_role: bool,
    pub has_qualified_role: bool,
}

/// Classification of a verification attempt. The command layer picks its
/// response message from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    /// Caller already holds both roles; nothing to do.
    AlreadyVerified,
    /// Linked, and played minutes meet the guild threshold.
    LinkedAndQualified { ckey: Ckey, living_minutes: i64 },
    /// Linked, but short of the threshold. The base role is still granted;
    /// this is a partial success, not an error.
    LinkedButUnqualified {
        ckey: Ckey,
        living_minutes: i64,
        required_minutes: i64,
    },
    /// No token matched and no valid link exists for the account.
    NoLinkFound,
    /// A ckey was resolved but the game has no player record for it.
    PlayerNotFound { ckey: Ckey },
}

/// A requested relink: invalidate every valid link for the ckey and for the
/// account, then claim the token. Executed by the caller as one atomic step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRewrite {
    pub token: String,
    pub ckey: Ckey,
    pub account_id: u64,
}

/// Side effects the resolver wants performed. It never touches the link
/// store or the chat platform itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationRequests {
    pub rewrite: Option<LinkRewrite>,
    pub grant_base: Option<u64>,
    pub grant_qualified: Option<u64>,
}

impl MutationRequests {
    pub fn is_empty(&self) -> bool {
        self.rewrite.is_none() && self.grant_base.is_none() && self.grant_qualified.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: ResolutionResult,
    pub requests: MutationRequests,
}

impl Resolution {
    /// An outcome that requests no side effects at all.
    pub(super) fn outcome_only(result: ResolutionResult) -> Self {
        Resolution {
            result,
            requests: MutationRequests::default(),
        }
    }
}
