use clap::{Args, Subcommand};
use common::prelude::*;

use crate::op::Op;
use crate::ops::session::{Session, SessionError};

#[derive(Args, Debug, Clone)]
pub struct Add {
    /// Username to register
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct List {}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    #[error(transparent)]
    State(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl Op for Add {
    type Error = UserError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx).await?;
        let result = self.run(&session).await;
        session.close().await?;
        result
    }
}

impl Add {
    async fn run(&self, session: &Session) -> Result<String, UserError> {
        let key = SecretKey::generate();
        let home = session.vault.register(&self.name, &key).await?;
        session.state.save_user(&self.name, &key, &home)?;
        Ok(format!(
            "Registered {} ({})\n- Home: {}",
            self.name,
            key.public().to_hex(),
            home.location()
        ))
    }
}

#[async_trait::async_trait]
impl Op for List {
    type Error = UserError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = Session::open(ctx).await?;
        let listed = list_users(&session);
        session.close().await?;
        listed
    }
}

fn list_users(session: &Session) -> Result<String, UserError> {
    let mut lines = Vec::new();
    for name in session.state.users()? {
        let (key, _) = session.state.load_user(&name)?;
        let status = match session.vault.user_key(&name) {
            Some(registered) if registered == key.public() => "registered",
            Some(_) => "key mismatch",
            None => "unregistered",
        };
        lines.push(format!("{} {} ({})", name, key.public().short_hex(), status));
    }
    if lines.is_empty() {
        return Ok("No local users".to_string());
    }
    Ok(lines.join("\n"))
}

crate::command_enum! {
    (Add, Add),
    (List, List),
}

pub type UserCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct User {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[async_trait::async_trait]
impl Op for User {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}
