pub mod mock_build_source;
