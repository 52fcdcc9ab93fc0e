use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::{
    error::TypeError,
    pagination::PageRequest,
    schema::Uuid,
};
use crate::constants::{RECIPE_COUNT_PER_PAGE, USER_COUNT_PER_PAGE};

pub type FormData = HashMap<String, Value>;

/// Query parameters as handed over by the routing layer. Repeated keys
/// (`?tags=a&tags=b`) arrive as a JSON array.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut inner: FormData = HashMap::new();
        pairs.into_iter().for_each(|(key, value)| {
            let value = Value::String(value.to_string());
            match inner.get_mut(key) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    inner.insert(key.to_string(), value);
                }
            }
        });
        Self { inner }
    }

    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(Value::String(v)) => v
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for {key}"))),
            Some(Value::Number(v)) => v
                .to_string()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid number for {key}"))),
            Some(_) => Err(TypeError::new(&format!("Failed to parse {key} as a number"))),
            None => Ok(None),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<String>, TypeError> {
        match self.inner.get(key) {
            Some(value) => match value.as_str() {
                Some(v) => Ok(Some(v.to_string())),
                None => Err(TypeError::new(&format!("Failed to parse {key} as str"))),
            },
            None => Ok(None),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<Vec<String>, TypeError> {
        match self.inner.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value
                        .as_str()
                        .map(|v| v.to_string())
                        .ok_or_else(|| TypeError::new(&format!("Failed to parse {key} as str")))
                })
                .collect(),
            Some(Value::String(v)) => Ok(vec![v.to_string()]),
            Some(_) => Err(TypeError::new(&format!("Failed to parse {key} as a list"))),
            None => Ok(vec![]),
        }
    }

    /// `1` switches a filter on, any other number leaves it off.
    pub fn get_flag(&self, key: &str) -> Result<bool, TypeError> {
        Ok(self.get_number::<i64>(key)? == Some(1))
    }

    pub fn get_page(&self, default_limit: i64) -> Result<PageRequest, TypeError> {
        Ok(PageRequest::new(
            self.get_number("page")?,
            self.get_number("limit")?,
            default_limit,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Uuid>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub page: PageRequest,
}

impl Default for RecipeFilter {
    fn default() -> Self {
        Self {
            tags: vec![],
            author: None,
            is_favorited: false,
            is_in_shopping_cart: false,
            page: PageRequest::new(None, None, RECIPE_COUNT_PER_PAGE),
        }
    }
}

impl TryFrom<Form> for RecipeFilter {
    type Error = TypeError;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        Ok(Self {
            tags: form.get_list("tags")?,
            author: form.get_number("author")?,
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
            page: form.get_page(RECIPE_COUNT_PER_PAGE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub recipes_limit: Option<i64>,
    pub page: PageRequest,
}

impl TryFrom<Form> for SubscriptionFilter {
    type Error = TypeError;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        let recipes_limit: Option<i64> = form.get_number("recipes_limit")?;
        if recipes_limit.is_some_and(|limit| limit < 0) {
            return Err(TypeError::new("recipes_limit must not be negative"));
        }

        Ok(Self {
            recipes_limit,
            page: form.get_page(USER_COUNT_PER_PAGE)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientFilter {
    pub name: Option<String>,
}

impl TryFrom<Form> for IngredientFilter {
    type Error = TypeError;

    fn try_from(form: Form) -> Result<Self, Self::Error> {
        Ok(Self {
            name: form.get_str("name")?.filter(|name| !name.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_become_lists() {
        let form = Form::from_pairs([("tags", "breakfast"), ("tags", "lunch"), ("author", "3")]);

        assert_eq!(form.get_list("tags").unwrap(), vec!["breakfast", "lunch"]);
        assert_eq!(form.get_list("missing").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn recipe_filter_from_query() {
        let form = Form::from_pairs([
            ("tags", "dinner"),
            ("author", "3"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "0"),
            ("page", "2"),
            ("limit", "10"),
        ]);
        let filter = RecipeFilter::try_from(form).unwrap();

        assert_eq!(filter.tags, vec!["dinner"]);
        assert_eq!(filter.author, Some(3));
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
        assert_eq!(filter.page, PageRequest { page: 2, limit: 10 });
    }

    #[test]
    fn empty_query_uses_defaults() {
        let filter = RecipeFilter::try_from(Form::from_data(FormData::new())).unwrap();

        assert_eq!(filter, RecipeFilter::default());
        assert_eq!(filter.page.limit, RECIPE_COUNT_PER_PAGE);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let form = Form::from_pairs([("author", "me")]);

        assert!(RecipeFilter::try_from(form).is_err());
    }

    #[test]
    fn negative_recipes_limit_is_rejected() {
        let form = Form::from_pairs([("recipes_limit", "-1")]);

        assert!(SubscriptionFilter::try_from(form).is_err());
    }

    #[test]
    fn json_numbers_are_accepted() {
        let mut data = FormData::new();
        data.insert("recipes_limit".into(), serde_json::json!(2));
        let filter = SubscriptionFilter::try_from(Form::from_data(data)).unwrap();

        assert_eq!(filter.recipes_limit, Some(2));
    }

    #[test]
    fn blank_ingredient_name_is_no_filter() {
        let filter = IngredientFilter::try_from(Form::from_pairs([("name", "")])).unwrap();

        assert_eq!(filter.name, None);
    }
}
