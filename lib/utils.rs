//! Output helpers for binaries.

pub use ndarray_npy::NpzWriter;

/// Create a directory and all of its parents, evaluating to a
/// [`SimResult`][crate::error::SimResult].
#[macro_export]
macro_rules! mkdir {
    ( $dir:expr ) => {
        std::fs::create_dir_all(&$dir).map_err($crate::error::SimError::from)
    }
}

/// Write a set of named arrays to an `.npz` archive, evaluating to a
/// [`SimResult`][crate::error::SimResult].
///
/// ```ignore
/// write_npz!(
///     outdir.join("fid.npz"),
///     arrays: {
///         "time" => &time,
///         "fid" => &fid,
///     }
/// )?;
/// ```
#[macro_export]
macro_rules! write_npz {
    (
        $filepath:expr,
        arrays: { $( $name:expr => $arr:expr ),* $(,)? } $(,)?
    ) => {
        (|| -> $crate::error::SimResult<()> {
            let mut output = $crate::utils::NpzWriter::new(
                std::fs::File::create($filepath)?);
            $( output.add_array($name, $arr)?; )*
            output.finish()?;
            Ok(())
        })()
    }
}
