pub mod db;
pub mod db_structs;
pub mod sources;
pub mod sql_param;
pub mod statements;
