use crate::permissions::ActionType;

/// Every operation the routing layer can dispatch to. Resolving a request to
/// one of these decides both the permission it needs and the shape of its
/// answer, without looking at the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListRecipes,
    RetrieveRecipe,
    CreateRecipe,
    UpdateRecipe,
    DeleteRecipe,
    Favorite,
    ShoppingCart,
    DownloadShoppingCart,

    ListUsers,
    RetrieveUser,
    Me,
    Subscribe,
    Subscriptions,

    ListTags,
    RetrieveTag,
    CreateTag,
    ListIngredients,
    RetrieveIngredient,
    ImportIngredients,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// `RecipeView`: nested author, ingredients and tags plus membership flags.
    Recipe,
    /// `RecipeShort`: id, name, image, cooking time.
    RecipeShort,
    User,
    Subscription,
    Tag,
    Ingredient,
    PlainText,
    Empty,
}

impl Operation {
    pub fn required_action(self) -> Option<ActionType> {
        match self {
            Operation::ListRecipes
            | Operation::RetrieveRecipe
            | Operation::ListUsers
            | Operation::RetrieveUser
            | Operation::ListTags
            | Operation::RetrieveTag
            | Operation::ListIngredients
            | Operation::RetrieveIngredient => None,
            Operation::CreateRecipe => Some(ActionType::CreateRecipes),
            Operation::UpdateRecipe | Operation::DeleteRecipe => {
                Some(ActionType::ManageOwnRecipes)
            }
            Operation::Favorite => Some(ActionType::ManageOwnFavorites),
            Operation::ShoppingCart | Operation::DownloadShoppingCart => {
                Some(ActionType::ManageOwnShoppingCart)
            }
            Operation::Me => Some(ActionType::ViewOwnProfile),
            Operation::Subscribe | Operation::Subscriptions => {
                Some(ActionType::ManageOwnSubscriptions)
            }
            Operation::CreateTag | Operation::ImportIngredients => {
                Some(ActionType::ManageReferenceData)
            }
        }
    }

    /// Writes answer with the read representation of what they stored, not
    /// with the payload they were given.
    pub fn representation(self) -> Representation {
        match self {
            Operation::ListRecipes
            | Operation::RetrieveRecipe
            | Operation::CreateRecipe
            | Operation::UpdateRecipe => Representation::Recipe,
            Operation::DeleteRecipe => Representation::Empty,
            Operation::Favorite | Operation::ShoppingCart => Representation::RecipeShort,
            Operation::DownloadShoppingCart => Representation::PlainText,
            Operation::ListUsers | Operation::RetrieveUser | Operation::Me => {
                Representation::User
            }
            Operation::Subscribe | Operation::Subscriptions => Representation::Subscription,
            Operation::ListTags | Operation::RetrieveTag | Operation::CreateTag => {
                Representation::Tag
            }
            Operation::ListIngredients
            | Operation::RetrieveIngredient
            | Operation::ImportIngredients => Representation::Ingredient,
        }
    }

    pub fn is_public(self) -> bool {
        self.required_action().is_none()
    }
}
