pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_COUNT_PER_PAGE: i64 = 100;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_NAME_MAX_LENGTH: usize = 200;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const IMAGE_MEGABYTE_LIMIT: usize = 5;
pub const IMAGE_BYTE_LIMIT: usize = IMAGE_MEGABYTE_LIMIT * 1024 * 1024;

pub const DEFAULT_TAG_COLOR: &str = "#569914";

pub const INGREDIENT_IMPORT_CHUNK: usize = 1000;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";
