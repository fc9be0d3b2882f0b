//! JSON testcases: repositories, jobs, configuration and the expected
//! outcome of one solve in a single file.

mod loader;
mod schema;

pub use loader::{
    build_request, build_testcase, check_result, load_testcase, parse_testcase, populate_pool,
    validate_testcase, write_testcase, LoadError, LoadedTestcase,
};
pub use schema::{ExpectedResult, JobJson, JobKindJson, RepositoryJson, SolvableJson, Testcase};
