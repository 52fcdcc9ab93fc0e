use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    constants::{IMAGE_BYTE_LIMIT, IMAGE_MEGABYTE_LIMIT, RECIPE_NAME_MAX_LENGTH},
    error::ActionError,
    schema::{RecipePayload, Uuid},
};

/// Referenced ids that were found in the reference tables.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    pub ingredients: HashSet<Uuid>,
    pub tags: HashSet<Uuid>,
}

impl Catalog {
    pub fn new(ingredients: impl IntoIterator<Item = Uuid>, tags: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            ingredients: ingredients.into_iter().collect(),
            tags: tags.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleViolation {
    pub rule: &'static str,
    pub reason: String,
}

impl From<RuleViolation> for ActionError {
    fn from(value: RuleViolation) -> Self {
        ActionError::Validation(value.reason)
    }
}

impl From<RuleViolation> for potion::Error {
    fn from(value: RuleViolation) -> Self {
        ActionError::from(value).into()
    }
}

type Check = fn(&RecipePayload, &Catalog) -> Result<(), String>;

pub struct CompositionRule {
    pub name: &'static str,
    check: Check,
}

impl CompositionRule {
    const fn new(name: &'static str, check: Check) -> Self {
        Self { name, check }
    }

    pub fn check(&self, payload: &RecipePayload, catalog: &Catalog) -> Result<(), RuleViolation> {
        (self.check)(payload, catalog).map_err(|reason| RuleViolation {
            rule: self.name,
            reason,
        })
    }
}

pub const CREATE_RULES: &[CompositionRule] = &[
    CompositionRule::new("required_fields", required_fields),
    CompositionRule::new("non_empty", non_empty),
    CompositionRule::new("ingredients_exist", ingredients_exist),
    CompositionRule::new("unique_ingredients", unique_ingredients),
    CompositionRule::new("unique_tags", unique_tags),
    CompositionRule::new("positive_amounts", positive_amounts),
    CompositionRule::new("positive_cooking_time", positive_cooking_time),
    CompositionRule::new("tags_exist", tags_exist),
    CompositionRule::new("name_length", name_length),
    CompositionRule::new("blank_text", blank_text),
    CompositionRule::new("image_size", image_size),
];

/// Same chain as [`CREATE_RULES`] minus the required scalar fields, since an
/// update keeps whatever the payload leaves out.
pub const UPDATE_RULES: &[CompositionRule] = &[
    CompositionRule::new("non_empty", non_empty),
    CompositionRule::new("ingredients_exist", ingredients_exist),
    CompositionRule::new("unique_ingredients", unique_ingredients),
    CompositionRule::new("unique_tags", unique_tags),
    CompositionRule::new("positive_amounts", positive_amounts),
    CompositionRule::new("positive_cooking_time", positive_cooking_time),
    CompositionRule::new("tags_exist", tags_exist),
    CompositionRule::new("name_length", name_length),
    CompositionRule::new("blank_text", blank_text),
    CompositionRule::new("image_size", image_size),
];

/// Runs the rules in order and stops at the first one that fails.
pub fn validate(
    rules: &[CompositionRule],
    payload: &RecipePayload,
    catalog: &Catalog,
) -> Result<(), RuleViolation> {
    rules
        .iter()
        .try_for_each(|rule| rule.check(payload, catalog))
}

fn required_fields(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    let missing: Vec<&str> = [
        ("name", payload.name.is_none()),
        ("text", payload.text.is_none()),
        ("cooking_time", payload.cooking_time.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, missing)| missing.then_some(field))
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("Missing required fields: {}", missing.join(", ")))
    }
}

fn non_empty(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    if payload.ingredients.is_empty() || payload.tags.is_empty() {
        return Err(String::from(
            "Ingredient and tag lists must not be empty",
        ));
    }
    Ok(())
}

fn ingredients_exist(payload: &RecipePayload, catalog: &Catalog) -> Result<(), String> {
    match payload
        .ingredients
        .iter()
        .find(|ingredient| !catalog.ingredients.contains(&ingredient.id))
    {
        Some(ingredient) => Err(format!("No ingredient exists with id {}", ingredient.id)),
        None => Ok(()),
    }
}

fn unique_ingredients(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    let mut seen = HashSet::new();
    for ingredient in payload.ingredients.iter() {
        if !seen.insert(ingredient.id) {
            return Err(format!("Ingredient {} is listed more than once", ingredient.id));
        }
    }
    Ok(())
}

fn unique_tags(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    let mut seen = HashSet::new();
    for tag in payload.tags.iter() {
        if !seen.insert(*tag) {
            return Err(format!("Tag {tag} is listed more than once"));
        }
    }
    Ok(())
}

fn positive_amounts(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    match payload.ingredients.iter().find(|ingredient| ingredient.amount < 1) {
        Some(ingredient) => Err(format!(
            "Amount of ingredient {} must be at least 1",
            ingredient.id
        )),
        None => Ok(()),
    }
}

fn positive_cooking_time(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    match payload.cooking_time {
        Some(time) if time < 1 => Err(String::from("Cooking time must be at least 1 minute")),
        _ => Ok(()),
    }
}

fn tags_exist(payload: &RecipePayload, catalog: &Catalog) -> Result<(), String> {
    match payload.tags.iter().find(|tag| !catalog.tags.contains(*tag)) {
        Some(tag) => Err(format!("No tag exists with id {tag}")),
        None => Ok(()),
    }
}

fn name_length(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    match payload.name.as_deref() {
        Some(name) if name.trim().is_empty() => Err(String::from("Recipe name must not be blank")),
        Some(name) if name.chars().count() > RECIPE_NAME_MAX_LENGTH => Err(format!(
            "Recipe name must be at most {RECIPE_NAME_MAX_LENGTH} characters"
        )),
        _ => Ok(()),
    }
}

fn blank_text(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    match payload.text.as_deref() {
        Some(text) if text.trim().is_empty() => Err(String::from("Recipe text must not be blank")),
        _ => Ok(()),
    }
}

fn image_size(payload: &RecipePayload, _: &Catalog) -> Result<(), String> {
    match payload.image.as_deref() {
        Some(image) => {
            let size = decoded_image_size(image)?;
            if size > IMAGE_BYTE_LIMIT {
                return Err(format!(
                    "Maximum image size is {IMAGE_MEGABYTE_LIMIT}MB"
                ));
            }
            Ok(())
        }
        None => Ok(()),
    }
}

/// Size in bytes of the payload of a `data:image/<ext>;base64,<data>` URI.
pub fn decoded_image_size(image: &str) -> Result<usize, String> {
    let (header, data) = image
        .split_once(";base64,")
        .ok_or_else(|| String::from("Image must be a base64 encoded data URI"))?;

    if !header.starts_with("data:image/") {
        return Err(String::from("Image must be a base64 encoded data URI"));
    }

    STANDARD
        .decode(data.trim())
        .map(|bytes| bytes.len())
        .map_err(|_| String::from("Image is not valid base64"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IngredientAmount;

    fn payload(ingredients: &[(Uuid, i32)], tags: &[Uuid]) -> RecipePayload {
        RecipePayload {
            ingredients: ingredients
                .iter()
                .map(|&(id, amount)| IngredientAmount { id, amount })
                .collect(),
            tags: tags.to_vec(),
            image: None,
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry")),
            cooking_time: Some(20),
        }
    }

    fn catalog() -> Catalog {
        Catalog::new([1, 2, 3], [10, 11])
    }

    fn failing_rule(payload: &RecipePayload) -> Option<&'static str> {
        validate(CREATE_RULES, payload, &catalog())
            .err()
            .map(|violation| violation.rule)
    }

    #[test]
    fn valid_payload_passes() {
        assert_eq!(failing_rule(&payload(&[(1, 5), (2, 1)], &[10])), None);
    }

    #[test]
    fn empty_lists_reject() {
        assert_eq!(failing_rule(&payload(&[], &[10])), Some("non_empty"));
        assert_eq!(failing_rule(&payload(&[(1, 5)], &[])), Some("non_empty"));
    }

    #[test]
    fn unknown_ingredient_rejects() {
        assert_eq!(failing_rule(&payload(&[(99, 5)], &[10])), Some("ingredients_exist"));
    }

    #[test]
    fn duplicate_ingredient_rejects_regardless_of_amounts() {
        for (first, second) in [(1, 1), (5, 10), (3, 0), (0, 0)] {
            assert_eq!(
                failing_rule(&payload(&[(1, first), (1, second)], &[10])),
                Some("unique_ingredients")
            );
        }
    }

    #[test]
    fn duplicate_tag_rejects() {
        assert_eq!(failing_rule(&payload(&[(1, 5)], &[10, 10])), Some("unique_tags"));
    }

    #[test]
    fn amount_boundary() {
        assert_eq!(failing_rule(&payload(&[(1, 0)], &[10])), Some("positive_amounts"));
        assert_eq!(failing_rule(&payload(&[(1, -4)], &[10])), Some("positive_amounts"));
        assert_eq!(failing_rule(&payload(&[(1, 1)], &[10])), None);
    }

    #[test]
    fn cooking_time_boundary() {
        let mut draft = payload(&[(1, 1)], &[10]);
        draft.cooking_time = Some(0);
        assert_eq!(failing_rule(&draft), Some("positive_cooking_time"));

        draft.cooking_time = Some(1);
        assert_eq!(failing_rule(&draft), None);
    }

    #[test]
    fn unknown_tag_rejects() {
        assert_eq!(failing_rule(&payload(&[(1, 1)], &[42])), Some("tags_exist"));
    }

    #[test]
    fn rules_short_circuit_in_order() {
        // Unknown and duplicated ingredient with a zero amount: existence is checked first.
        let draft = payload(&[(99, 0), (99, 0)], &[10, 10]);
        assert_eq!(failing_rule(&draft), Some("ingredients_exist"));

        // Duplicate ingredient and duplicate tag: ingredients come first.
        let draft = payload(&[(1, 0), (1, 0)], &[10, 10]);
        assert_eq!(failing_rule(&draft), Some("unique_ingredients"));
    }

    #[test]
    fn create_requires_scalar_fields_but_update_does_not() {
        let mut draft = payload(&[(1, 1)], &[10]);
        draft.name = None;
        draft.cooking_time = None;

        let violation = validate(CREATE_RULES, &draft, &catalog()).unwrap_err();
        assert_eq!(violation.rule, "required_fields");
        assert_eq!(violation.reason, "Missing required fields: name, cooking_time");

        assert!(validate(UPDATE_RULES, &draft, &catalog()).is_ok());
    }

    #[test]
    fn update_still_rejects_empty_lists() {
        let draft = RecipePayload::default();
        let violation = validate(UPDATE_RULES, &draft, &catalog()).unwrap_err();
        assert_eq!(violation.rule, "non_empty");
    }

    #[test]
    fn blank_and_long_names_reject() {
        let mut draft = payload(&[(1, 1)], &[10]);
        draft.name = Some(String::from("   "));
        assert_eq!(failing_rule(&draft), Some("name_length"));

        draft.name = Some("a".repeat(RECIPE_NAME_MAX_LENGTH + 1));
        assert_eq!(failing_rule(&draft), Some("name_length"));

        draft.name = Some("a".repeat(RECIPE_NAME_MAX_LENGTH));
        assert_eq!(failing_rule(&draft), None);
    }

    #[test]
    fn blank_text_rejects_on_create_and_update() {
        let mut draft = payload(&[(1, 1)], &[10]);
        draft.text = Some(String::new());
        assert_eq!(failing_rule(&draft), Some("blank_text"));

        draft.text = Some(String::from(" \n\t"));
        let violation = validate(UPDATE_RULES, &draft, &catalog()).unwrap_err();
        assert_eq!(violation.rule, "blank_text");

        draft.text = None;
        assert!(validate(UPDATE_RULES, &draft, &catalog()).is_ok());
    }

    #[test]
    fn image_size_ceiling() {
        let mut draft = payload(&[(1, 1)], &[10]);

        let small = STANDARD.encode([0u8; 16]);
        draft.image = Some(format!("data:image/png;base64,{small}"));
        assert_eq!(failing_rule(&draft), None);

        let large = STANDARD.encode(vec![0u8; IMAGE_BYTE_LIMIT + 1]);
        draft.image = Some(format!("data:image/png;base64,{large}"));
        assert_eq!(failing_rule(&draft), Some("image_size"));
    }

    #[test]
    fn malformed_image_rejects() {
        let mut draft = payload(&[(1, 1)], &[10]);
        draft.image = Some(String::from("recipes/photo.png"));
        assert_eq!(failing_rule(&draft), Some("image_size"));

        draft.image = Some(String::from("data:text/plain;base64,aGk="));
        assert_eq!(failing_rule(&draft), Some("image_size"));

        draft.image = Some(String::from("data:image/png;base64,***"));
        assert_eq!(failing_rule(&draft), Some("image_size"));
    }

    #[test]
    fn violation_converts_to_validation_error() {
        let violation = validate(CREATE_RULES, &payload(&[], &[]), &catalog()).unwrap_err();
        let error: ActionError = violation.into();
        assert_eq!(
            error,
            ActionError::Validation(String::from("Ingredient and tag lists must not be empty"))
        );
    }
}
