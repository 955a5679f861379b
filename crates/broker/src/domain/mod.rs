pub mod process_management;
