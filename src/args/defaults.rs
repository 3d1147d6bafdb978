pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
