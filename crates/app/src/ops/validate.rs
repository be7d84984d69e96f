use clap::Args;
use common::username::{is_valid_username, MAX_USERNAME_LENGTH};

#[derive(Args, Debug, Clone)]
pub struct Validate {
    /// Username to check
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    #[error(
        "invalid username {0:?}: use 1 to {max} characters from a-z, 0-9, '_' and '-', \
         starting and ending with a letter or digit, without adjacent separators",
        max = MAX_USERNAME_LENGTH
    )]
    Invalid(String),
}

#[async_trait::async_trait]
impl crate::op::Op for Validate {
    type Error = ValidateError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        if !is_valid_username(&self.name) {
            return Err(ValidateError::Invalid(self.name.clone()));
        }
        Ok(format!("{} is a valid username", self.name))
    }
}
