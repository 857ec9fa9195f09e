use docbase_types::{IdToken, Uid};

/// The client's cached view of who is signed in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated { uid: Uid, token: IdToken },
}

impl SessionState {
    pub fn uid(&self) -> Option<&Uid> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { uid, .. } => Some(uid),
        }
    }

    /// Bearer credential to present to the server facade.
    pub fn token(&self) -> Option<&IdToken> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { token, .. } => Some(token),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}
