use a9_kitti::lidar::required_field_indices;
use a9_kitti_format::A9_POINT_FIELDS;
use eyre::{ensure, Result, WrapErr};
use std::path::Path;

pub fn info(file: impl AsRef<Path>) -> Result<()> {
    let file = file.as_ref();

    ensure!(
        file.extension().map(|ext| ext == "pcd").unwrap_or(false),
        "file name must ends with '.pcd', but get '{}'",
        file.display()
    );

    let reader = pcd_rs::DynReader::open(file)
        .wrap_err_with(|| format!("unable to open '{}'", file.display()))?;
    let meta = reader.meta();

    println!("name\ttype\tcount");
    meta.field_defs.iter().for_each(|field| {
        let pcd_rs::FieldDef {
            ref name,
            kind,
            count,
        } = *field;

        println!("{}\t{:?}\t{}", name, kind, count);
    });

    println!();
    println!("points\t{}", meta.num_points);
    match required_field_indices(meta) {
        Ok(_) => println!("KITTI fields ({}) are present", A9_POINT_FIELDS.join(", ")),
        Err(reason) => println!("not convertible to KITTI: {reason}"),
    }

    Ok(())
}
