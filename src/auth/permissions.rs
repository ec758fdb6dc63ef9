use crate::auth::Actor;
use crate::workflow::ApprovalStage;

/// Role names as issued by the identity provider
pub mod roles {
    pub const FOREMAN: &str = "FOREMAN";
    pub const INCHARGE: &str = "INCHARGE";
    pub const CHECKING: &str = "CHECKING";
    pub const MANAGER: &str = "MANAGER";
    pub const ADMIN: &str = "ADMIN";
    pub const SUPER_ADMIN: &str = "SUPER_ADMIN";

    /// May sign off at any stage
    pub const OVERRIDE: [&str; 3] = [MANAGER, ADMIN, SUPER_ADMIN];
}

/// Decides whether an actor may act on a timesheet at a given stage
pub trait PermissionChecker: Send + Sync {
    fn can_approve(&self, actor: &Actor, stage: ApprovalStage) -> bool;
}

/// Stage-to-role table used by the approval chain
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePermissionChecker;

impl RolePermissionChecker {
    pub fn stage_role(stage: ApprovalStage) -> &'static str {
        match stage {
            ApprovalStage::Foreman => roles::FOREMAN,
            ApprovalStage::Incharge => roles::INCHARGE,
            ApprovalStage::Checking => roles::CHECKING,
            ApprovalStage::Manager => roles::MANAGER,
        }
    }
}

impl PermissionChecker for RolePermissionChecker {
    fn can_approve(&self, actor: &Actor, stage: ApprovalStage) -> bool {
        actor.has_role(Self::stage_role(stage)) || actor.has_any_role(&roles::OVERRIDE)
    }
}
