use index_vec::define_index_type;

// indices baked into instrumented code; these must stay stable for the life of the process
define_index_type!{pub struct CallSiteId = u32;}
define_index_type!{pub struct ResumptionId = u32;}
