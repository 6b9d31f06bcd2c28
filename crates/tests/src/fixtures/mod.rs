pub mod stub_supabase;
pub mod test_app;
