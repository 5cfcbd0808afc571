use super::domain::{OrganizationId, PrincipalId};
use super::error::ProcurementError;
use super::repository::RepositoryError;

/// Lookup of the employees registered as responsible for an organization.
pub trait PrincipalDirectory {
    fn find_principal(
        &mut self,
        organization: OrganizationId,
        username: &str,
    ) -> Result<Option<PrincipalId>, RepositoryError>;
}

/// Resolve `username` as a responsible principal of `organization`.
///
/// Unknown users and users without responsibility for the organization both
/// surface as [`ProcurementError::PrincipalNotFound`].
pub fn resolve_principal<D>(
    directory: &mut D,
    organization: OrganizationId,
    username: &str,
) -> Result<PrincipalId, ProcurementError>
where
    D: PrincipalDirectory + ?Sized,
{
    directory
        .find_principal(organization, username)?
        .ok_or(ProcurementError::PrincipalNotFound)
}
