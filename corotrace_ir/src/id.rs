use index_vec::define_index_type;

define_index_type!{pub struct InsnIdx = u32;}
