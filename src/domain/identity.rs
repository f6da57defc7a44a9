/// A customer account. Bookings reference customers directly by account id.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl CustomerAccount {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }
}

/// A technician's professional profile.
///
/// `user_id` links the profile to its login account: technician-scoped
/// requests arrive with the account id and are resolved to the profile
/// before ownership checks.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnicianProfile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub category_id: String,
}

impl TechnicianProfile {
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            category_id: category_id.into(),
        }
    }
}

/// A service category.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
