//! Command checks.

use crate::{Context, Error};

/// Passes only for members holding one of the configured staff roles.
pub async fn is_staff(ctx: Context<'_>) -> Result<bool, Error> {
    let member = ctx
        .author_member()
        .await
        .ok_or("This command can only be used in the server")?;
    if member
        .roles
        .iter()
        .any(|role| ctx.data().config.is_staff_role(*role))
    {
        Ok(true)
    } else {
        Err("Only staff can use this command.".into())
    }
}
