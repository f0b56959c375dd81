pub mod png_snapshot_writer;
