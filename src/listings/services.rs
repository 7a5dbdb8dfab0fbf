use tracing::warn;

use crate::{
    error::{AppError, AppResult},
    listings::repo_types::Item,
    users::repo_types::User,
};

/// Mutation policy shared by update and delete: the seller or an admin.
pub fn authorize_mutation(requester: &User, item: &Item) -> AppResult<()> {
    if requester.id == item.seller_id || requester.is_admin {
        Ok(())
    } else {
        warn!(
            user_id = requester.id,
            item_id = item.id,
            seller_id = item.seller_id,
            "listing mutation refused"
        );
        Err(AppError::Unauthorized)
    }
}
