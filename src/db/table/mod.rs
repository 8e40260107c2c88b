pub mod column_def;
pub mod defaults;
pub mod nested;
pub mod schema;
pub mod table_def;
pub mod text_format;
