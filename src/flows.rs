//! Canned verification flows
//!
//! Step-sequence builders for the recurring flows of the library
//! application: logging in, opening menu sections, creating records,
//! applying for a card. Each builder returns a plain `Vec<Step>` that can
//! be extended, serialized, or run as-is.

use crate::selector::Selector;
use crate::step::Step;

/// Test ids of the stable elements the flows address.
pub mod selectors {
    /// Login menu entry
    pub const MENU_LOGIN: &str = "menu-login";
    /// Login form container
    pub const LOGIN_FORM: &str = "login-form";
    /// Username input
    pub const LOGIN_USERNAME: &str = "login-username";
    /// Password input
    pub const LOGIN_PASSWORD: &str = "login-password";
    /// Login submit button
    pub const LOGIN_SUBMIT: &str = "login-submit";
    /// Post-login main content container
    pub const MAIN_CONTENT: &str = "main-content";
    /// Pre-login welcome screen
    pub const WELCOME_SCREEN: &str = "welcome-screen";

    /// Books section marker
    pub const BOOK_TABLE: &str = "book-table";
    /// Authors section marker
    pub const AUTHORS_SECTION: &str = "authors-section";
    /// Loans section marker
    pub const LOANS_SECTION: &str = "loans-section";
    /// Users section marker
    pub const USERS_SECTION: &str = "users-section";
    /// Libraries section marker
    pub const LIBRARIES_SECTION: &str = "libraries-section";
    /// Card applications table
    pub const APPLIED_TABLE: &str = "applied-table";

    /// New author name input
    pub const NEW_AUTHOR_NAME: &str = "new-author-name";
    /// Add author button
    pub const ADD_AUTHOR_BTN: &str = "add-author-btn";
    /// New library name input
    pub const NEW_LIBRARY_NAME: &str = "new-library-name";
    /// Add library button
    pub const ADD_LIBRARY_BTN: &str = "add-library-btn";
    /// New book title input
    pub const NEW_BOOK_TITLE: &str = "new-book-title";
    /// Add book button
    pub const ADD_BOOK_BTN: &str = "add-book-btn";

    /// Card application name input
    pub const APPLY_NAME: &str = "apply-name";
    /// Card application email input
    pub const APPLY_EMAIL: &str = "apply-email";
    /// Card application submit button
    pub const APPLY_SUBMIT: &str = "apply-submit";
}

/// The application's sections reachable from the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Book catalog
    Books,
    /// Author records
    Authors,
    /// Loan tracking
    Loans,
    /// User administration
    Users,
    /// Library branches
    Libraries,
    /// Library card applications
    Applied,
}

impl Section {
    /// Test id of the menu entry opening this section
    pub fn menu_id(&self) -> &'static str {
        match self {
            Section::Books => "menu-books",
            Section::Authors => "menu-authors",
            Section::Loans => "menu-loans",
            Section::Users => "menu-users",
            Section::Libraries => "menu-libraries",
            Section::Applied => "menu-applied",
        }
    }

    /// Test id of the element that marks the section as loaded
    pub fn marker_id(&self) -> &'static str {
        match self {
            Section::Books => selectors::BOOK_TABLE,
            Section::Authors => selectors::AUTHORS_SECTION,
            Section::Loans => selectors::LOANS_SECTION,
            Section::Users => selectors::USERS_SECTION,
            Section::Libraries => selectors::LIBRARIES_SECTION,
            Section::Applied => selectors::APPLIED_TABLE,
        }
    }
}

/// How long a login is given to reach the main content, in ms.
pub const LOGIN_TIMEOUT_MS: u64 = 10_000;

/// Navigate to the root page, open the login form, authenticate, and
/// wait for the main content to appear.
pub fn login(username: &str, password: &str) -> Vec<Step> {
    vec![
        Step::navigate("/"),
        Step::click(selectors::MENU_LOGIN),
        Step::wait_for_visible(selectors::LOGIN_FORM),
        Step::fill(selectors::LOGIN_USERNAME, username),
        Step::fill(selectors::LOGIN_PASSWORD, password),
        Step::click(selectors::LOGIN_SUBMIT),
        Step::wait_for_visible(selectors::MAIN_CONTENT).with_timeout_ms(LOGIN_TIMEOUT_MS),
    ]
}

/// [`login`] with the standard librarian fixture credentials.
pub fn login_as_librarian() -> Vec<Step> {
    login("librarian", "password")
}

/// Open a menu section and wait for its marker element.
pub fn open_section(section: Section) -> Vec<Step> {
    vec![
        Step::click(section.menu_id()),
        Step::wait_for_visible(section.marker_id()),
    ]
}

/// Create an author record through the authors section form.
/// Assumes the authors section is already open.
pub fn create_author(name: &str) -> Vec<Step> {
    vec![
        Step::fill(selectors::NEW_AUTHOR_NAME, name),
        Step::click(selectors::ADD_AUTHOR_BTN),
    ]
}

/// Create a library branch through the libraries section form.
/// Assumes the libraries section is already open.
pub fn create_library(name: &str) -> Vec<Step> {
    vec![
        Step::fill(selectors::NEW_LIBRARY_NAME, name),
        Step::click(selectors::ADD_LIBRARY_BTN),
    ]
}

/// Create a book through the books section form.
/// Assumes the books section is already open.
pub fn create_book(title: &str) -> Vec<Step> {
    vec![
        Step::fill(selectors::NEW_BOOK_TITLE, title),
        Step::click(selectors::ADD_BOOK_BTN),
    ]
}

/// Submit a library card application through the unauthenticated
/// apply-for-card page.
pub fn apply_for_card(name: &str, email: &str) -> Vec<Step> {
    vec![
        Step::navigate("/apply-for-card.html"),
        Step::wait_for_hidden(Selector::css("#librarian-section")),
        Step::fill(selectors::APPLY_NAME, name),
        Step::fill(selectors::APPLY_EMAIL, email),
        Step::click(selectors::APPLY_SUBMIT),
    ]
}

/// Append a screenshot step capturing the end state of a flow.
pub fn with_screenshot(mut steps: Vec<Step>, path: &str) -> Vec<Step> {
    steps.push(Step::screenshot(path));
    steps
}
