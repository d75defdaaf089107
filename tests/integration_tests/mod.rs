use std::path::PathBuf;

mod laplace;
mod poisson;

fn data_output_path() -> PathBuf {
    PathBuf::from("data/integration_tests/")
}
