use crate::{
    error::ActionError,
    operations::Operation,
    schema::{UserRole, Uuid},
};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::ViewOwnProfile,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::ManageOwnSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::ViewOwnProfile,
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnShoppingCart,
            ActionType::ManageOwnSubscriptions,
            ActionType::ManageAllRecipes,
            ActionType::ManageReferenceData,
        ],
    ),
];

#[derive(Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub enum ActionType {
    ViewOwnProfile,
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnShoppingCart,
    ManageOwnSubscriptions,

    ManageAllRecipes,
    ManageReferenceData,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if &session.role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

/// Identity of a signed-in requester, as handed over by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl SessionData {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), ActionError> {
        if !action.authenticate(self) {
            return Err(ActionError::Forbidden(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }

    /// Authors manage their own recipes, admins manage everyone's.
    pub fn authenticate_owner(&self, author_id: Uuid) -> Result<(), ActionError> {
        self.authenticate(ActionType::ManageOwnRecipes)?;

        if author_id == self.user_id || ActionType::ManageAllRecipes.authenticate(self) {
            return Ok(());
        }
        Err(ActionError::Forbidden(String::from(
            "Only the author can change this recipe",
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    Session(SessionData),
}

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::Anonymous => None,
            Identity::Session(session) => Some(session.user_id),
        }
    }

    /// Session allowed to run `operation`. Public operations need no session
    /// and are rejected here, since there is nothing to hand back.
    pub fn session(&self, operation: Operation) -> Result<&SessionData, ActionError> {
        let session = match self {
            Identity::Anonymous => return Err(ActionError::Unauthorized),
            Identity::Session(session) => session,
        };

        match operation.required_action() {
            Some(action) => {
                session.authenticate(action)?;
                Ok(session)
            }
            None => Err(ActionError::Validation(format!(
                "{operation:?} does not run on behalf of a user"
            ))),
        }
    }
}

impl From<SessionData> for Identity {
    fn from(value: SessionData) -> Self {
        Identity::Session(value)
    }
}
