pub mod fixtures;

#[cfg(test)]
mod cors_tests;
#[cfg(test)]
mod dashboard_tests;
#[cfg(test)]
mod meeting_tests;
#[cfg(test)]
mod user_admin_tests;
