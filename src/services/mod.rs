// Reference data
pub mod carriers;
pub mod contacts;
pub mod reference_data;

// Orders and their attachments
pub mod documents;
pub mod order_form;
pub mod orders;

// Read models
pub mod dashboard;
pub mod lookups;

// Accounts
pub mod users;
